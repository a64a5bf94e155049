//! Content-addressed request cache
//!
//! Wraps every oracle call so the whole pipeline is idempotent and
//! resumable. Entries are namespaced by call kind, optionally expire after
//! a TTL measured from write time, and may hold either one complete reply
//! or an ordered chunk sequence that replays as a time-spaced simulated
//! stream on hit.

use crate::hash::RequestHash;
use crate::request::OracleReply;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Cache namespace per call kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// One complete reply per call.
    OneShot,
    /// Reply delivered as an ordered chunk sequence.
    Streaming,
}

impl CallKind {
    /// Directory/namespace label for this kind.
    pub fn namespace(self) -> &'static str {
        match self {
            CallKind::OneShot => "oneshot",
            CallKind::Streaming => "streaming",
        }
    }
}

/// One recorded chunk of a streamed reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyChunk {
    /// Spacing before this chunk, preserved on replay.
    pub delay_ms: u64,
    /// The chunk's text.
    pub text: String,
}

/// A cached oracle reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachedReply {
    /// One complete reply.
    Complete(OracleReply),
    /// Recorded chunk sequence of a streamed reply.
    Chunks(Vec<ReplyChunk>),
}

impl CachedReply {
    /// Assemble the reply value, concatenating chunk text when needed.
    pub fn assemble(&self) -> Result<OracleReply, CacheError> {
        match self {
            CachedReply::Complete(reply) => Ok(reply.clone()),
            CachedReply::Chunks(chunks) => {
                let text: String = chunks.iter().map(|c| c.text.as_str()).collect();
                serde_json::from_str(&text).map_err(|err| CacheError::Serialization {
                    detail: err.to_string(),
                })
            }
        }
    }
}

/// Cache/storage failures abort the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the backing store failed.
    #[error("cache i/o failure at {path}: {detail}")]
    Io {
        /// The path the failure occurred at.
        path: String,
        /// Underlying error text.
        detail: String,
    },

    /// A stored entry could not be decoded.
    #[error("cache entry malformed: {detail}")]
    Serialization {
        /// Underlying error text.
        detail: String,
    },
}

/// Storage behind the cache boundary: `get`/`put` keyed by request hash.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up the entry for `hash` in `kind`'s namespace.
    async fn get(
        &self,
        kind: CallKind,
        hash: &RequestHash,
    ) -> Result<Option<CachedReply>, CacheError>;

    /// Store `reply` under `hash` in `kind`'s namespace.
    async fn put(
        &self,
        kind: CallKind,
        hash: &RequestHash,
        reply: CachedReply,
    ) -> Result<(), CacheError>;
}

/// In-memory store on moka, with optional TTL from write time.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: moka::future::Cache<(CallKind, RequestHash), Arc<CachedReply>>,
}

impl MemoryCache {
    /// A cache bounded to `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: moka::future::Cache::new(max_capacity),
        }
    }

    /// A bounded cache whose entries expire `ttl` after write.
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: moka::future::Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Current number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(
        &self,
        kind: CallKind,
        hash: &RequestHash,
    ) -> Result<Option<CachedReply>, CacheError> {
        Ok(self
            .inner
            .get(&(kind, *hash))
            .await
            .map(|arc| (*arc).clone()))
    }

    async fn put(
        &self,
        kind: CallKind,
        hash: &RequestHash,
        reply: CachedReply,
    ) -> Result<(), CacheError> {
        self.inner.insert((kind, *hash), Arc::new(reply)).await;
        Ok(())
    }
}

/// File store: one JSON file per `namespace/hash`, so interrupted runs
/// resume without re-querying the oracle.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    ttl: Option<Duration>,
}

impl FileCache {
    /// A store rooted at `root` with no expiry.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ttl: None,
        }
    }

    /// A store whose entries expire `ttl` after their file write time.
    pub fn with_ttl(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl: Some(ttl),
        }
    }

    fn entry_path(&self, kind: CallKind, hash: &RequestHash) -> PathBuf {
        self.root.join(kind.namespace()).join(format!("{hash}.json"))
    }

    fn is_expired(&self, path: &Path) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|written| written.elapsed().ok())
            .map(|age| age > ttl)
            .unwrap_or(false)
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn get(
        &self,
        kind: CallKind,
        hash: &RequestHash,
    ) -> Result<Option<CachedReply>, CacheError> {
        let path = self.entry_path(kind, hash);
        if !path.exists() {
            return Ok(None);
        }
        if self.is_expired(&path) {
            let _ = std::fs::remove_file(&path);
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|err| CacheError::Io {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;
        let reply = serde_json::from_str(&text).map_err(|err| CacheError::Serialization {
            detail: err.to_string(),
        })?;
        Ok(Some(reply))
    }

    async fn put(
        &self,
        kind: CallKind,
        hash: &RequestHash,
        reply: CachedReply,
    ) -> Result<(), CacheError> {
        let path = self.entry_path(kind, hash);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| CacheError::Io {
                path: parent.display().to_string(),
                detail: err.to_string(),
            })?;
        }
        let text = serde_json::to_string_pretty(&reply).map_err(|err| {
            CacheError::Serialization {
                detail: err.to_string(),
            }
        })?;
        std::fs::write(&path, text).map_err(|err| CacheError::Io {
            path: path.display().to_string(),
            detail: err.to_string(),
        })
    }
}

/// Replay recorded chunks with their original spacing, so a cache hit looks
/// like a live stream to whoever consumes the channel.
pub fn replay_chunks(chunks: Vec<ReplyChunk>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        for chunk in chunks {
            if chunk.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(chunk.delay_ms)).await;
            }
            if tx.send(chunk.text).await.is_err() {
                break;
            }
        }
    });
    rx
}
