//! The oracle ↔ validator refinement loop
//!
//! An explicit fold over at most `max_attempts` turns: each turn proposes a
//! candidate, validates it in the sandbox, and threads the resulting report
//! into the next turn. Terminates on first acceptance or bound exhaustion.
//! Examples the oracle marks unsatisfiable leave the acceptance criterion
//! for the remaining turns of this call only.

use reweave_extract::Example;
use reweave_model::TypeId;
use reweave_oracle::{
    CacheError, DependencySignature, OracleError, RewriteOracle, RewriteRequest,
};
use reweave_sandbox::{validate, Candidate, DependencySource, ValidationReport};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Everything one rewrite task owns while it runs.
#[derive(Debug, Clone)]
pub struct AttemptInput {
    /// Type being rewritten.
    pub type_id: TypeId,
    /// The legacy minified source.
    pub legacy_source: String,
    /// Observed name, when one exists.
    pub name_hint: Option<String>,
    /// Accepted dependency signatures shown to the oracle.
    pub dependency_signatures: Vec<DependencySignature>,
    /// Accepted dependency sources compiled into the sandbox.
    pub dependency_sources: Vec<DependencySource>,
    /// Examples the candidate must reproduce.
    pub examples: Vec<Example>,
}

/// Why a type failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Every attempt was used without acceptance.
    OracleExhausted {
        /// How many attempts were made.
        attempts: usize,
    },
    /// The oracle returned no candidate.
    OracleGaveUp,
    /// The oracle boundary errored.
    OracleUnavailable {
        /// Underlying error text.
        detail: String,
    },
    /// Extraction produced nothing verifiable.
    NoExamples,
    /// The whole attempt loop exceeded its wall-clock bound.
    TimedOut,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::OracleExhausted { attempts } => {
                write!(f, "no accepted candidate after {attempts} attempt(s)")
            }
            FailureReason::OracleGaveUp => write!(f, "oracle returned no candidate"),
            FailureReason::OracleUnavailable { detail } => {
                write!(f, "oracle unavailable: {detail}")
            }
            FailureReason::NoExamples => write!(f, "no verifiable examples"),
            FailureReason::TimedOut => write!(f, "attempt loop timed out"),
        }
    }
}

/// Terminal result of one type's attempt loop.
#[derive(Debug, Clone)]
pub enum AttemptVerdict {
    /// A candidate validated against every non-skipped example.
    Accepted {
        /// The accepted candidate.
        candidate: Candidate,
        /// Example indices removed from the acceptance criterion.
        skipped: BTreeSet<usize>,
    },
    /// No candidate was accepted.
    Failed {
        /// Why the loop ended.
        reason: FailureReason,
        /// The final validation report, when one was produced.
        last_report: Option<ValidationReport>,
    },
}

/// Run the refinement fold for one type.
///
/// Cache/storage failures bubble up (fatal); every other oracle problem
/// resolves to a `Failed` verdict.
pub async fn run_attempts(
    oracle: &dyn RewriteOracle,
    input: &AttemptInput,
    max_attempts: usize,
) -> Result<AttemptVerdict, CacheError> {
    if input.examples.is_empty() {
        return Ok(AttemptVerdict::Failed {
            reason: FailureReason::NoExamples,
            last_report: None,
        });
    }

    let request = RewriteRequest {
        legacy_source: input.legacy_source.clone(),
        name_hint: input.name_hint.clone(),
        dependencies: input.dependency_signatures.clone(),
        examples: input.examples.clone(),
        streaming: false,
    };

    let mut skipped: BTreeSet<usize> = BTreeSet::new();
    let mut feedback: Option<ValidationReport> = None;

    for attempt in 1..=max_attempts {
        let reply = match oracle.propose(&request, feedback.as_ref()).await {
            Ok(reply) => reply,
            Err(OracleError::Cache(err)) => return Err(err),
            Err(err) => {
                return Ok(AttemptVerdict::Failed {
                    reason: FailureReason::OracleUnavailable {
                        detail: err.to_string(),
                    },
                    last_report: feedback,
                })
            }
        };

        skipped.extend(
            reply
                .unsatisfiable
                .iter()
                .copied()
                .filter(|i| *i < input.examples.len()),
        );

        let Some(candidate) = reply.candidate else {
            return Ok(AttemptVerdict::Failed {
                reason: FailureReason::OracleGaveUp,
                last_report: feedback,
            });
        };

        let skip_set = skipped.iter().copied().collect();
        let outcome = validate(
            &candidate,
            &input.dependency_sources,
            &input.examples,
            &skip_set,
        );
        tracing::debug!(
            type_id = %input.type_id,
            attempt,
            accepted = outcome.accepted,
            "attempt validated"
        );
        if outcome.accepted {
            return Ok(AttemptVerdict::Accepted {
                candidate,
                skipped,
            });
        }
        feedback = Some(outcome.report);
    }

    Ok(AttemptVerdict::Failed {
        reason: FailureReason::OracleExhausted {
            attempts: max_attempts,
        },
        last_report: feedback,
    })
}
