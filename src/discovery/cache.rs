//! TTL-cached context resolution with double-checked locking on a
//! reader-writer lock: a read-lock-only path would let concurrent callers
//! race past a stale entry into duplicate detection work, so a miss is
//! re-checked under the write lock before doing that work.

use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::Context;
use crate::cancel::CancellationToken;
use crate::config::WorkspaceConfig;
use crate::error::Result;
use crate::fs::Filesystem;

struct Entry {
    root: PathBuf,
    context: Context,
    stored_at: Instant,
}

/// Inspectable cache state, exposed to callers for diagnostics.
#[derive(Debug, Clone)]
pub struct CacheInfo {
    pub present: bool,
    pub root: Option<PathBuf>,
    pub age: Option<Duration>,
    pub expires_in: Option<Duration>,
}

pub struct TtlContextCache {
    ttl: Duration,
    inner: RwLock<Option<Entry>>,
}

impl TtlContextCache {
    pub fn new(ttl: Duration) -> Self {
        TtlContextCache { ttl, inner: RwLock::new(None) }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(5))
    }

    fn is_valid(entry: &Entry, root: &Path, ttl: Duration, now: Instant) -> bool {
        entry.root == root && now.saturating_duration_since(entry.stored_at) <= ttl
    }

    /// Returns a cached `Context` for `root` if one is fresh, otherwise runs
    /// `detect` under a write lock (re-checking validity after acquiring it,
    /// so a stampede of readers collapses into a single detection).
    pub fn get_or_detect(
        &self,
        root: &Path,
        fs: &dyn Filesystem,
        config: &WorkspaceConfig,
        cancel: &CancellationToken,
    ) -> Result<Context> {
        let now = Instant::now();
        {
            let read = self.inner.read().unwrap();
            if let Some(entry) = read.as_ref() {
                if Self::is_valid(entry, root, self.ttl, now) {
                    log::debug!("context cache hit for {}", root.display());
                    return Ok(entry.context.clone());
                }
            }
        }

        let mut write = self.inner.write().unwrap();
        let now = Instant::now();
        if let Some(entry) = write.as_ref() {
            if Self::is_valid(entry, root, self.ttl, now) {
                log::debug!("context cache hit for {} (write lock, raced reader)", root.display());
                return Ok(entry.context.clone());
            }
        }

        log::debug!("context cache miss for {}, detecting fresh", root.display());
        let context = super::discover_context(root, fs, config, cancel)?;
        *write = Some(Entry { root: root.to_path_buf(), context: context.clone(), stored_at: now });
        Ok(context)
    }

    /// Explicitly invalidates the cache. The next `get_or_detect` call is
    /// guaranteed to perform a fresh detection.
    pub fn invalidate(&self) {
        log::debug!("context cache invalidated");
        *self.inner.write().unwrap() = None;
    }

    pub fn info(&self) -> CacheInfo {
        let now = Instant::now();
        let read = self.inner.read().unwrap();
        match read.as_ref() {
            Some(entry) => {
                let age = now.saturating_duration_since(entry.stored_at);
                CacheInfo {
                    present: true,
                    root: Some(entry.root.clone()),
                    age: Some(age),
                    expires_in: Some(self.ttl.saturating_sub(age)),
                }
            }
            None => CacheInfo { present: false, root: None, age: None, expires_in: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscoveryConfig, WorkspaceConfig};
    use crate::fs::MemoryFilesystem;

    fn cfg() -> WorkspaceConfig {
        WorkspaceConfig { discovery: DiscoveryConfig::default(), modules: Vec::new() }
    }

    #[test]
    fn caches_within_ttl() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_file("/ws/.version", "1.0.0\n");
        let cache = TtlContextCache::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let first = cache.get_or_detect(Path::new("/ws"), &fs, &cfg(), &cancel).unwrap();
        let second = cache.get_or_detect(Path::new("/ws"), &fs, &cfg(), &cancel).unwrap();
        assert_eq!(first.mode, second.mode);
        assert!(cache.info().present);
    }

    #[test]
    fn invalidate_forces_fresh_detection() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_file("/ws/.version", "1.0.0\n");
        let cache = TtlContextCache::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cache.get_or_detect(Path::new("/ws"), &fs, &cfg(), &cancel).unwrap();
        cache.invalidate();
        assert!(!cache.info().present);
        cache.get_or_detect(Path::new("/ws"), &fs, &cfg(), &cancel).unwrap();
        assert!(cache.info().present);
    }

    #[test]
    fn expired_entry_is_not_reused() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_file("/ws/.version", "1.0.0\n");
        let cache = TtlContextCache::new(Duration::from_millis(0));
        let cancel = CancellationToken::new();
        cache.get_or_detect(Path::new("/ws"), &fs, &cfg(), &cancel).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let info_before = cache.info();
        assert_eq!(info_before.expires_in, Some(Duration::from_millis(0)));
        // a fresh detect still succeeds (re-detects rather than panicking on expiry)
        cache.get_or_detect(Path::new("/ws"), &fs, &cfg(), &cancel).unwrap();
    }
}
