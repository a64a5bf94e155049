use crate::cache::{CacheStore, CachedReply, CallKind};
use crate::hash::RequestHash;
use crate::request::{OracleError, OracleReply, RewriteRequest};
use async_trait::async_trait;
use reweave_sandbox::ValidationReport;
use serde::Serialize;

/// The oracle boundary.
///
/// One call is one turn: the engine threads the previous attempt's
/// validation report back in as `feedback`. Transport, prompting, and model
/// choice live behind this trait.
#[async_trait]
pub trait RewriteOracle: Send + Sync {
    /// Propose a candidate for `request`, incorporating the previous
    /// attempt's validation `feedback` when present.
    async fn propose(
        &self,
        request: &RewriteRequest,
        feedback: Option<&ValidationReport>,
    ) -> Result<OracleReply, OracleError>;
}

#[derive(Serialize)]
struct TurnPayload<'a> {
    request: &'a RewriteRequest,
    feedback: Option<&'a ValidationReport>,
}

/// JSON-over-HTTP adapter: POSTs the turn payload, expects an
/// [`OracleReply`] body.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOracle {
    /// An adapter POSTing to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RewriteOracle for HttpOracle {
    async fn propose(
        &self,
        request: &RewriteRequest,
        feedback: Option<&ValidationReport>,
    ) -> Result<OracleReply, OracleError> {
        let payload = TurnPayload { request, feedback };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| OracleError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| OracleError::Transport(err.to_string()))?;
        response
            .json::<OracleReply>()
            .await
            .map_err(|err| OracleError::InvalidReply(err.to_string()))
    }
}

/// Memoizing wrapper: the same turn payload issued twice performs one
/// underlying call and yields identical replies, chunked entries included.
pub struct CachingOracle<O, S> {
    inner: O,
    store: S,
    kind: CallKind,
}

impl<O, S> CachingOracle<O, S> {
    /// Wrap `inner`, memoizing one-shot calls in `store`.
    pub fn new(inner: O, store: S) -> Self {
        Self {
            inner,
            store,
            kind: CallKind::OneShot,
        }
    }

    /// Wrap `inner`, memoizing under the streaming namespace.
    pub fn streaming(inner: O, store: S) -> Self {
        Self {
            inner,
            store,
            kind: CallKind::Streaming,
        }
    }
}

#[async_trait]
impl<O: RewriteOracle, S: CacheStore> RewriteOracle for CachingOracle<O, S> {
    async fn propose(
        &self,
        request: &RewriteRequest,
        feedback: Option<&ValidationReport>,
    ) -> Result<OracleReply, OracleError> {
        let payload = TurnPayload { request, feedback };
        let hash = RequestHash::compute_serializable(&payload)
            .map_err(|err| OracleError::InvalidReply(err.to_string()))?;

        if let Some(cached) = self.store.get(self.kind, &hash).await? {
            tracing::debug!(hash = %hash.short(), kind = self.kind.namespace(), "oracle cache hit");
            return match cached {
                CachedReply::Complete(reply) => Ok(reply),
                CachedReply::Chunks(chunks) => {
                    // Consume the simulated stream the way a live caller
                    // would, then assemble.
                    let mut rx = crate::cache::replay_chunks(chunks);
                    let mut text = String::new();
                    while let Some(part) = rx.recv().await {
                        text.push_str(&part);
                    }
                    serde_json::from_str(&text)
                        .map_err(|err| OracleError::InvalidReply(err.to_string()))
                }
            };
        }

        let reply = self.inner.propose(request, feedback).await?;
        self.store
            .put(self.kind, &hash, CachedReply::Complete(reply.clone()))
            .await?;
        tracing::debug!(hash = %hash.short(), kind = self.kind.namespace(), "oracle call cached");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::scripted::ScriptedOracle;
    use pretty_assertions::assert_eq;
    use reweave_sandbox::Candidate;

    fn request() -> RewriteRequest {
        RewriteRequest {
            legacy_source: "var b=1".to_string(),
            name_hint: Some("Badge".to_string()),
            dependencies: Vec::new(),
            examples: Vec::new(),
            streaming: false,
        }
    }

    fn reply() -> OracleReply {
        OracleReply::candidate(Candidate {
            name: "Badge".to_string(),
            description: "badge".to_string(),
            source_text: "<span>{label}</span>".to_string(),
        })
    }

    #[tokio::test]
    async fn identical_requests_hit_cache_once() {
        let scripted = ScriptedOracle::new().then(reply()).then(reply());
        let oracle = CachingOracle::new(scripted, MemoryCache::new(16));

        let first = oracle.propose(&request(), None).await.unwrap();
        let second = oracle.propose(&request(), None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(oracle.inner.calls(), 1);
    }

    #[tokio::test]
    async fn different_feedback_is_a_different_entry() {
        let scripted = ScriptedOracle::new().then(reply()).then(OracleReply::give_up());
        let oracle = CachingOracle::new(scripted, MemoryCache::new(16));

        let report = ValidationReport {
            compilation_errors: vec!["boom".to_string()],
            ..Default::default()
        };
        let first = oracle.propose(&request(), None).await.unwrap();
        let second = oracle.propose(&request(), Some(&report)).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(oracle.inner.calls(), 2);
    }

    #[tokio::test]
    async fn chunked_entries_replay_identically() {
        let store = MemoryCache::new(16);
        let json = serde_json::to_string(&reply()).unwrap();
        let mid = json.len() / 2;
        let req = request();
        let payload = TurnPayload {
            request: &req,
            feedback: None,
        };
        let hash = RequestHash::compute_serializable(&payload).unwrap();
        store
            .put(
                CallKind::OneShot,
                &hash,
                CachedReply::Chunks(vec![
                    crate::cache::ReplyChunk {
                        delay_ms: 1,
                        text: json[..mid].to_string(),
                    },
                    crate::cache::ReplyChunk {
                        delay_ms: 1,
                        text: json[mid..].to_string(),
                    },
                ]),
            )
            .await
            .unwrap();

        let oracle = CachingOracle::new(ScriptedOracle::new(), store);
        let first = oracle.propose(&request(), None).await.unwrap();
        let second = oracle.propose(&request(), None).await.unwrap();
        assert_eq!(first, reply());
        assert_eq!(first, second);
        assert_eq!(oracle.inner.calls(), 0);
    }
}
