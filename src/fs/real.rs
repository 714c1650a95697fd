use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};

use super::{DirEntry, EntryKind, Filesystem, Metadata};

/// The production filesystem, backed directly by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl RealFilesystem {
    pub fn new() -> Self {
        RealFilesystem
    }
}

fn set_perm(path: &Path, perm: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(perm))
    }
    #[cfg(not(unix))]
    {
        let _ = (path, perm);
        Ok(())
    }
}

impl Filesystem for RealFilesystem {
    fn read_file(&self, path: &Path, cancel: &CancellationToken) -> Result<String> {
        cancel.check()?;
        fs::read_to_string(path).map_err(|e| Error::file_op("read", path, e))
    }

    fn write_file(
        &self,
        path: &Path,
        contents: &str,
        perm: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        fs::write(path, contents).map_err(|e| Error::file_op("write", path, e))?;
        set_perm(path, perm).map_err(|e| Error::file_op("chmod", path, e))
    }

    fn stat(&self, path: &Path, cancel: &CancellationToken) -> Result<Metadata> {
        cancel.check()?;
        let meta = fs::symlink_metadata(path).map_err(|e| Error::file_op("stat", path, e))?;
        let kind = if meta.is_dir() { EntryKind::Dir } else { EntryKind::File };
        #[cfg(unix)]
        let permissions = meta.permissions().mode();
        #[cfg(not(unix))]
        let permissions = if meta.permissions().readonly() { 0o444 } else { 0o644 };
        Ok(Metadata { kind, permissions, len: meta.len() })
    }

    fn mkdir_all(&self, path: &Path, perm: u32, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        fs::create_dir_all(path).map_err(|e| Error::file_op("mkdir_all", path, e))?;
        set_perm(path, perm).map_err(|e| Error::file_op("chmod", path, e))
    }

    fn remove(&self, path: &Path, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        fs::remove_file(path).map_err(|e| Error::file_op("remove", path, e))
    }

    fn remove_all(&self, path: &Path, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        fs::remove_dir_all(path).map_err(|e| Error::file_op("remove_all", path, e))
    }

    fn read_dir(&self, path: &Path, cancel: &CancellationToken) -> Result<Vec<DirEntry>> {
        cancel.check()?;
        let read = fs::read_dir(path).map_err(|e| Error::file_op("read_dir", path, e))?;
        let mut out = Vec::new();
        for entry in read {
            cancel.check()?;
            let entry = entry.map_err(|e| Error::file_op("read_dir", path, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue, // permission-robust: skip unreadable entries
            };
            let kind = if file_type.is_dir() { EntryKind::Dir } else { EntryKind::File };
            out.push(DirEntry { name, path: entry.path(), kind });
        }
        Ok(out)
    }
}
