//! Rewrite oracle client
//!
//! The oracle is an external collaborator: given legacy source, a name
//! hint, accepted dependency signatures, and examples, it proposes a
//! candidate component or marks examples unsatisfiable. This crate carries
//! the request/response contract, an HTTP adapter, the content-addressed
//! request cache that makes the pipeline idempotent and resumable, and a
//! scripted oracle for tests.

#![warn(unreachable_pub)]

mod cache;
mod client;
mod hash;
mod request;
mod scripted;

pub use cache::{
    replay_chunks, CacheError, CacheStore, CachedReply, CallKind, FileCache, MemoryCache,
    ReplyChunk,
};
pub use client::{CachingOracle, HttpOracle, RewriteOracle};
pub use hash::RequestHash;
pub use request::{DependencySignature, OracleError, OracleReply, RewriteRequest};
pub use scripted::ScriptedOracle;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
