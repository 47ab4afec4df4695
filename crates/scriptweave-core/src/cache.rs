//! Per-invocation document cache using moka
//!
//! Holds the last-read source document keyed by its absolute path so repeated
//! scans within one build read the file once. Asking for a different path
//! busts the cache; content changes on disk are never observed.

use crate::error::ScanError;
use moka::future::Cache;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for cache behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Underlying filesystem reads performed
    pub reads: u64,
    /// Reads answered from memory
    pub hits: u64,
}

/// Source document cache
///
/// Cheap to clone; clones share the same entries and counters.
#[derive(Debug, Clone)]
pub struct DocumentCache {
    inner: Cache<PathBuf, Arc<str>>,
    current: Arc<Mutex<Option<PathBuf>>>,
    reads: Arc<AtomicU64>,
    hits: Arc<AtomicU64>,
}

impl DocumentCache {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::new(16),
            current: Arc::new(Mutex::new(None)),
            reads: Arc::new(AtomicU64::new(0)),
            hits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the document at `path`, reading it on first use.
    ///
    /// Concurrent callers for the same path share a single read.
    ///
    /// # Errors
    /// [`ScanError::Io`] if the document cannot be read. Failures are not
    /// cached.
    pub async fn get_or_read(&self, path: &Path) -> Result<Arc<str>, ScanError> {
        self.bust_if_moved(path);

        if let Some(cached) = self.inner.get(path).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }

        let reads = Arc::clone(&self.reads);
        let owned = path.to_path_buf();
        self.inner
            .try_get_with(path.to_path_buf(), async move {
                reads.fetch_add(1, Ordering::Relaxed);
                tokio::fs::read_to_string(&owned).await.map(Arc::<str>::from)
            })
            .await
            .map_err(|source| ScanError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Path of the document currently held
    #[must_use]
    pub fn current_path(&self) -> Option<PathBuf> {
        self.current.lock().clone()
    }

    /// Drop the cached document
    pub fn invalidate(&self) {
        self.inner.invalidate_all();
        *self.current.lock() = None;
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            reads: self.reads.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }

    fn bust_if_moved(&self, path: &Path) {
        let mut current = self.current.lock();
        if current.as_deref() == Some(path) {
            return;
        }
        if let Some(previous) = current.replace(path.to_path_buf()) {
            tracing::debug!(from = %previous.display(), to = %path.display(), "document path changed, busting cache");
            self.inner.invalidate_all();
        }
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new()
    }
}
