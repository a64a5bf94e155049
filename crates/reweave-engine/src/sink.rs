use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Output sink failures; storage I/O is fatal to the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    /// The underlying storage failed.
    #[error("sink i/o failure at {path}: {detail}")]
    Io {
        /// The path the failure occurred at.
        path: String,
        /// Underlying error text.
        detail: String,
    },

    /// The path names no stored entry.
    #[error("no such entry: {0}")]
    NotFound(String),

    /// The path would resolve outside the sink root.
    #[error("path escapes sink root: {0}")]
    InvalidPath(String),
}

/// Where accepted component source is persisted.
///
/// The engine only writes text; directory layout and naming beyond the
/// configured output directory are an external structuring concern.
pub trait OutputSink: Send + Sync {
    /// Write `content` under the sink-relative `path`, creating parents.
    fn write_text(&self, path: &str, content: &str) -> Result<(), SinkError>;
    /// Read the text stored under `path`.
    fn read_text(&self, path: &str) -> Result<String, SinkError>;
    /// Delete the entry under `path`.
    fn remove(&self, path: &str) -> Result<(), SinkError>;
    /// Every stored path, sorted.
    fn list(&self) -> Result<Vec<String>, SinkError>;
}

/// Filesystem sink rooted at one directory.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    /// A sink writing under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SinkError> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes {
            return Err(SinkError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl OutputSink for FsSink {
    fn write_text(&self, path: &str, content: &str) -> Result<(), SinkError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|err| SinkError::Io {
                path: parent.display().to_string(),
                detail: err.to_string(),
            })?;
        }
        std::fs::write(&full, content).map_err(|err| SinkError::Io {
            path: full.display().to_string(),
            detail: err.to_string(),
        })
    }

    fn read_text(&self, path: &str) -> Result<String, SinkError> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(SinkError::NotFound(path.to_string()));
        }
        std::fs::read_to_string(&full).map_err(|err| SinkError::Io {
            path: full.display().to_string(),
            detail: err.to_string(),
        })
    }

    fn remove(&self, path: &str) -> Result<(), SinkError> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(SinkError::NotFound(path.to_string()));
        }
        std::fs::remove_file(&full).map_err(|err| SinkError::Io {
            path: full.display().to_string(),
            detail: err.to_string(),
        })
    }

    fn list(&self) -> Result<Vec<String>, SinkError> {
        let mut entries = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(read) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in read.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    entries.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        entries.sort();
        Ok(entries)
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemorySink {
    /// An empty in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for MemorySink {
    fn write_text(&self, path: &str, content: &str) -> Result<(), SinkError> {
        self.files
            .lock()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn read_text(&self, path: &str) -> Result<String, SinkError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| SinkError::NotFound(path.to_string()))
    }

    fn remove(&self, path: &str) -> Result<(), SinkError> {
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| SinkError::NotFound(path.to_string()))
    }

    fn list(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.files.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_roundtrip() {
        let sink = MemorySink::new();
        sink.write_text("ui/Badge.cmp", "<span/>").unwrap();
        assert_eq!(sink.read_text("ui/Badge.cmp").unwrap(), "<span/>");
        assert_eq!(sink.list().unwrap(), vec!["ui/Badge.cmp".to_string()]);
        sink.remove("ui/Badge.cmp").unwrap();
        assert!(matches!(
            sink.read_text("ui/Badge.cmp"),
            Err(SinkError::NotFound(_))
        ));
    }

    #[test]
    fn fs_sink_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());

        sink.write_text("components/Badge.cmp", "<span/>").unwrap();
        assert_eq!(
            sink.read_text("components/Badge.cmp").unwrap(),
            "<span/>"
        );
        assert_eq!(
            sink.list().unwrap(),
            vec!["components/Badge.cmp".to_string()]
        );
        sink.remove("components/Badge.cmp").unwrap();
        assert!(sink.list().unwrap().is_empty());
    }

    #[test]
    fn fs_sink_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        assert!(matches!(
            sink.write_text("../escape.txt", "x"),
            Err(SinkError::InvalidPath(_))
        ));
    }
}
