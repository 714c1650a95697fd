//! Filesystem abstraction.
//!
//! A narrow capability surface over `std::fs`, expressed as a trait so tests
//! can swap in an in-memory double instead of touching disk. Per-operation
//! overrides stay in the test-double implementation; production code never
//! branches on whether it's talking to a real or fake filesystem.

mod memory;
mod real;

pub use memory::MemoryFilesystem;
pub use real::RealFilesystem;

use std::path::{Path, PathBuf};

use crate::cancel::CancellationToken;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

#[derive(Debug, Clone)]
pub struct Metadata {
    pub kind: EntryKind,
    pub permissions: u32,
    pub len: u64,
}

/// Every operation observes cancellation before issuing the underlying
/// syscall, and surfaces a cancellation error without partial writes.
pub trait Filesystem: Send + Sync {
    fn read_file(&self, path: &Path, cancel: &CancellationToken) -> Result<String>;

    fn write_file(
        &self,
        path: &Path,
        contents: &str,
        perm: u32,
        cancel: &CancellationToken,
    ) -> Result<()>;

    fn stat(&self, path: &Path, cancel: &CancellationToken) -> Result<Metadata>;

    fn mkdir_all(&self, path: &Path, perm: u32, cancel: &CancellationToken) -> Result<()>;

    fn remove(&self, path: &Path, cancel: &CancellationToken) -> Result<()>;

    fn remove_all(&self, path: &Path, cancel: &CancellationToken) -> Result<()>;

    /// Symlink traversal is not attempted by default.
    fn read_dir(&self, path: &Path, cancel: &CancellationToken) -> Result<Vec<DirEntry>>;

    fn exists(&self, path: &Path, cancel: &CancellationToken) -> bool {
        self.stat(path, cancel).is_ok()
    }
}
