//! Sandbox & diff validator
//!
//! Compiles a candidate component plus its already-accepted dependencies
//! into an isolated in-memory module set, statically renders each example's
//! usage expression, and compares the output against the expected markup
//! with a canonicalizing structural diff. Nothing here touches the real
//! filesystem; dependency references resolve only through [`ModuleSet`].
//!
//! # Template language
//!
//! Candidate source is an HTML template: `{path}` interpolates a prop into
//! text or attribute position, capitalized tags invoke dependency
//! components, and a prop holding markup (a placeholder or an embedded
//! element) is inserted as a node.
//!
//! ```html
//! <div class="card">
//!   <Badge label={label}/>
//!   {content}
//! </div>
//! ```

#![warn(unreachable_pub)]

mod canonical;
mod compile;
mod diff;
mod modules;
mod render;
mod validate;

pub use canonical::{canonicalize, canonicalize_all, CanonicalNode};
pub use compile::{compile, AttrPart, AttrValue, CompileError, Template, TemplateNode};
pub use diff::{diff_nodes, DiffEntry, DiffKind};
pub use modules::ModuleSet;
pub use render::{render, RenderOutput, RuntimeWarning};
pub use validate::{
    validate, Candidate, DependencySource, ExampleDiff, ExampleWarnings, ValidationOutcome,
    ValidationReport,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
