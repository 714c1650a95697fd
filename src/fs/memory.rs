use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};

use super::{DirEntry, EntryKind, Filesystem, Metadata};

#[derive(Debug, Clone)]
enum Node {
    File { contents: String, perm: u32 },
    Dir { perm: u32 },
}

/// The name of an operation, used to key injected error overrides for tests
/// that need to simulate e.g. a single unreadable `.version` file.
pub type Op = &'static str;

/// Thread-safe in-memory filesystem double. Per-operation error overrides let
/// a test force a specific path+op combination to fail, e.g. to simulate a
/// single unreadable file among several healthy ones in a parallel run.
#[derive(Default)]
pub struct MemoryFilesystem {
    nodes: Mutex<HashMap<PathBuf, Node>>,
    overrides: Mutex<HashMap<(PathBuf, Op), Error>>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        MemoryFilesystem { nodes: Mutex::new(HashMap::new()), overrides: Mutex::new(HashMap::new()) }
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.nodes.lock().unwrap().insert(
            path.into(),
            Node::File { contents: contents.into(), perm: 0o600 },
        );
        self
    }

    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.nodes.lock().unwrap().insert(path.into(), Node::Dir { perm: 0o755 });
        self
    }

    /// Forces `op` on `path` to fail with `error` until cleared.
    pub fn fail_on(&self, path: impl Into<PathBuf>, op: Op, error: Error) {
        self.overrides.lock().unwrap().insert((path.into(), op), error);
    }

    fn check_override(&self, path: &Path, op: Op) -> Result<()> {
        let overrides = self.overrides.lock().unwrap();
        if let Some(err) = overrides.get(&(path.to_path_buf(), op)) {
            return Err(clone_error(err));
        }
        Ok(())
    }

    fn parent_dir_exists(&self, path: &Path) -> bool {
        match path.parent() {
            None => true,
            Some(p) if p.as_os_str().is_empty() => true,
            Some(p) => matches!(self.nodes.lock().unwrap().get(p), Some(Node::Dir { .. })),
        }
    }
}

fn clone_error(e: &Error) -> Error {
    // Error is not Clone (it wraps std::io::Error / Box<Error>); tests only
    // need kind-equivalent stand-ins, so we re-derive a fresh value of the
    // same shape rather than requiring Clone on the whole taxonomy.
    match e {
        Error::NotFound(s) => Error::NotFound(s.clone()),
        Error::InvalidInput(s) => Error::InvalidInput(s.clone()),
        Error::InvalidVersion { value, reason } => {
            Error::InvalidVersion { value: value.clone(), reason: reason.clone() }
        }
        Error::InvalidBumpType(s) => Error::InvalidBumpType(s.clone()),
        Error::PermissionDenied { op, path } => {
            Error::PermissionDenied { op: op.clone(), path: path.clone() }
        }
        Error::Timeout(d) => Error::Timeout(*d),
        Error::Cancelled => Error::Cancelled,
        Error::GitOperation(s) => Error::GitOperation(s.clone()),
        Error::Config(s) => Error::Config(s.clone()),
        Error::PathValidation { path, root } => {
            Error::PathValidation { path: path.clone(), root: root.clone() }
        }
        Error::FileOp { op, path, source } => Error::FileOp {
            op: op.clone(),
            path: path.clone(),
            source: std::io::Error::new(source.kind(), source.to_string()),
        },
        Error::Extension { extension, operation, source } => Error::Extension {
            extension: extension.clone(),
            operation: operation.clone(),
            source: Box::new(clone_error(source)),
        },
    }
}

impl Filesystem for MemoryFilesystem {
    fn read_file(&self, path: &Path, cancel: &CancellationToken) -> Result<String> {
        cancel.check()?;
        self.check_override(path, "read_file")?;
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::File { contents, .. }) => Ok(contents.clone()),
            Some(Node::Dir { .. }) => Err(Error::file_op(
                "read",
                path,
                std::io::Error::new(std::io::ErrorKind::Other, "is a directory"),
            )),
            None => Err(Error::NotFound(path.display().to_string())),
        }
    }

    fn write_file(
        &self,
        path: &Path,
        contents: &str,
        perm: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        self.check_override(path, "write_file")?;
        if !self.parent_dir_exists(path) {
            return Err(Error::NotFound(path.display().to_string()));
        }
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), Node::File { contents: contents.to_string(), perm });
        Ok(())
    }

    fn stat(&self, path: &Path, cancel: &CancellationToken) -> Result<Metadata> {
        cancel.check()?;
        self.check_override(path, "stat")?;
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::File { contents, perm }) => {
                Ok(Metadata { kind: EntryKind::File, permissions: *perm, len: contents.len() as u64 })
            }
            Some(Node::Dir { perm }) => Ok(Metadata { kind: EntryKind::Dir, permissions: *perm, len: 0 }),
            None => Err(Error::NotFound(path.display().to_string())),
        }
    }

    fn mkdir_all(&self, path: &Path, perm: u32, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        self.check_override(path, "mkdir_all")?;
        let mut nodes = self.nodes.lock().unwrap();
        let mut cur = PathBuf::new();
        for component in path.iter() {
            cur.push(component);
            nodes.entry(cur.clone()).or_insert(Node::Dir { perm });
        }
        Ok(())
    }

    fn remove(&self, path: &Path, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        self.check_override(path, "remove")?;
        match self.nodes.lock().unwrap().remove(path) {
            Some(Node::File { .. }) => Ok(()),
            Some(other) => {
                // put it back; `remove` only targets files
                self.nodes.lock().unwrap().insert(path.to_path_buf(), other);
                Err(Error::InvalidInput(format!("{} is a directory", path.display())))
            }
            None => Err(Error::NotFound(path.display().to_string())),
        }
    }

    fn remove_all(&self, path: &Path, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        self.check_override(path, "remove_all")?;
        let mut nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(path) {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let to_remove: Vec<PathBuf> =
            nodes.keys().filter(|p| *p == path || p.starts_with(path)).cloned().collect();
        for p in to_remove {
            nodes.remove(&p);
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path, cancel: &CancellationToken) -> Result<Vec<DirEntry>> {
        cancel.check()?;
        self.check_override(path, "read_dir")?;
        let nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(path), Some(Node::Dir { .. })) {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let mut out = Vec::new();
        for (p, node) in nodes.iter() {
            if p.parent() == Some(path) {
                let name = p.file_name().unwrap().to_string_lossy().into_owned();
                let kind = match node {
                    Node::File { .. } => EntryKind::File,
                    Node::Dir { .. } => EntryKind::Dir,
                };
                out.push(DirEntry { name, path: p.clone(), kind });
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let fs = MemoryFilesystem::new().with_dir("/ws");
        let cancel = CancellationToken::new();
        fs.write_file(Path::new("/ws/.version"), "1.2.3\n", 0o600, &cancel).unwrap();
        assert_eq!(fs.read_file(Path::new("/ws/.version"), &cancel).unwrap(), "1.2.3\n");
    }

    #[test]
    fn injected_error_overrides_read() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_file("/ws/.version", "1.0.0\n");
        fs.fail_on("/ws/.version", "read_file", Error::PermissionDenied {
            op: "read".into(),
            path: "/ws/.version".into(),
        });
        let cancel = CancellationToken::new();
        let err = fs.read_file(Path::new("/ws/.version"), &cancel).unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[test]
    fn cancellation_short_circuits() {
        let fs = MemoryFilesystem::new().with_dir("/ws");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fs.read_dir(Path::new("/ws"), &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn read_dir_lists_children_in_lexical_order() {
        let fs = MemoryFilesystem::new()
            .with_dir("/ws")
            .with_file("/ws/b", "")
            .with_file("/ws/a", "");
        let cancel = CancellationToken::new();
        let entries = fs.read_dir(Path::new("/ws"), &cancel).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
