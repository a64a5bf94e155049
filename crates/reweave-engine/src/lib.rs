//! Rewrite engine
//!
//! The orchestration loop over everything else in the workspace: track
//! instance statuses, decide which types are ready, dispatch bounded
//! oracle/validator tasks, commit results to the registry, and propagate
//! failure. Scheduling is single-threaded cooperative concurrency: every
//! piece of shared state is owned by the run loop, and tasks only ever
//! receive owned inputs and hand back owned outcomes.

#![warn(unreachable_pub)]

mod attempt;
mod config;
mod engine;
mod error;
mod registry;
mod report;
mod sink;
mod state;
mod status;

pub use attempt::{run_attempts, AttemptInput, AttemptVerdict, FailureReason};
pub use config::EngineConfig;
pub use engine::RewriteEngine;
pub use error::EngineError;
pub use registry::Registry;
pub use report::{AcceptedComponent, BlockedType, FailedType, RunReport};
pub use sink::{FsSink, MemorySink, OutputSink, SinkError};
pub use state::{allowed_transitions, validate_transition, StateError, TypeState};
pub use status::StatusArena;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
