//! Example extraction
//!
//! Turns a live instance into a verifiable (usage, expected output) pair:
//! caller-supplied regions become placeholders tagged by prop path, regions
//! of already-accepted types collapse into opaque references, and the result
//! is deduplicated and capped to bound oracle request size.

#![warn(unreachable_pub)]

mod extract;
mod usage;

pub use extract::{extract, Example, ExampleSet, ExtractConfig, ExtractReport, UnplacedRegion};
pub use usage::UsageExpression;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
