//! Derived relations over a snapshot
//!
//! Pure data derivation, no I/O: parent/child links, ancestor/descendant
//! sets, the caller-supplied classification of embedded elements, and the
//! per-type dependency sets the scheduler's readiness predicate runs on.

#![warn(unreachable_pub)]

mod correlate;
mod deps;
mod graph;

pub use correlate::{CorrelatedElement, CorrelationAmbiguity, UncorrelatedElement};
pub use graph::{ComponentGraph, GraphError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
