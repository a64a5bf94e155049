use crate::sink::SinkError;
use crate::state::StateError;
use reweave_graph::GraphError;
use reweave_oracle::CacheError;

/// Fatal engine failures.
///
/// Everything recoverable (compile errors, runtime warnings, semantic
/// mismatches, oracle exhaustion) is absorbed at the type level and shows
/// up in the run report; only a malformed snapshot, cache/storage I/O, or
/// an internal state violation aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The snapshot failed graph derivation.
    #[error("{0}")]
    Graph(#[from] GraphError),

    /// The oracle request cache failed.
    #[error("{0}")]
    Cache(#[from] CacheError),

    /// Persisting an accepted component failed.
    #[error("{0}")]
    Sink(#[from] SinkError),

    /// The type lifecycle was violated; indicates an engine bug.
    #[error("{0}")]
    State(#[from] StateError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use reweave_model::SnapshotError;

    #[test]
    fn graph_errors_convert() {
        let err: EngineError = GraphError::Snapshot(SnapshotError::MissingRoot).into();
        assert!(err.to_string().contains("no root"));
    }
}
