use reweave_extract::Example;
use reweave_sandbox::Candidate;
use serde::{Deserialize, Serialize};

/// Signature of an already-accepted dependency, as shown to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySignature {
    /// Accepted component name.
    pub name: String,
    /// Props the component consumes, e.g. `(label, kind)`.
    pub public_signature: String,
    /// Accepted description.
    pub description: String,
}

/// One rewrite request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRequest {
    /// The legacy minified source to regenerate.
    pub legacy_source: String,
    /// Observed component name, when one survived capture.
    pub name_hint: Option<String>,
    /// Already-accepted dependencies the candidate may invoke.
    pub dependencies: Vec<DependencySignature>,
    /// Input/output pairs the candidate must reproduce.
    pub examples: Vec<Example>,
    /// Part of the cache key: a streamed call and a one-shot call with the
    /// same payload are distinct entries.
    pub streaming: bool,
}

/// The oracle's answer to one turn.
///
/// `unsatisfiable` indices refer to `RewriteRequest::examples` and remove
/// those examples from the acceptance criterion for the remaining attempts
/// of the current type only. A reply with no candidate ends the attempt
/// loop early.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleReply {
    /// The proposed component; `None` ends the attempt loop.
    pub candidate: Option<Candidate>,
    /// Example indices the oracle declared unsatisfiable.
    pub unsatisfiable: Vec<usize>,
}

impl OracleReply {
    /// A reply proposing `candidate`.
    pub fn candidate(candidate: Candidate) -> Self {
        Self {
            candidate: Some(candidate),
            unsatisfiable: Vec::new(),
        }
    }

    /// A terminal reply with no candidate.
    pub fn give_up() -> Self {
        Self::default()
    }
}

/// Oracle boundary failures.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The call never produced a reply.
    #[error("oracle transport error: {0}")]
    Transport(String),

    /// The reply could not be decoded.
    #[error("oracle reply malformed: {0}")]
    InvalidReply(String),

    /// The request cache failed; fatal to the run.
    #[error("oracle cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),
}
