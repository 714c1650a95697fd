//! Workspace discovery and context resolution.

mod cache;

pub use cache::{CacheInfo, TtlContextCache};

use std::path::{Path, PathBuf};

use crate::cancel::CancellationToken;
use crate::config::{ExplicitModule, WorkspaceConfig};
use crate::error::{Error, Result};
use crate::fs::{EntryKind, Filesystem};
use crate::ignore::IgnoreSet;
use crate::semver::SemVersion;

pub const VERSION_FILE_NAME: &str = ".version";
pub const IGNORE_FILE_NAME: &str = ".sleyignore";

/// A directory containing a `.version` file -- the unit of independent
/// versioning in a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub rel_path: PathBuf,
    pub dir: PathBuf,
    /// Cached rendering loaded at discovery. Stale after any write -- callers
    /// must not compare it post-mutation.
    pub current_version: String,
}

impl Module {
    fn at(root: &Path, dir: PathBuf, fs: &dyn Filesystem, cancel: &CancellationToken) -> Module {
        let path = dir.join(VERSION_FILE_NAME);
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.to_string_lossy().into_owned());
        let rel_path = dir.strip_prefix(root).unwrap_or(&dir).to_path_buf();

        // Read failures degrade gracefully to an empty current_version: stale
        // version display is not a fatal condition at discovery time.
        let current_version = match fs.read_file(&path, cancel) {
            Ok(contents) => match SemVersion::parse(contents.trim()) {
                Ok(v) => v.render(),
                Err(e) => {
                    log::warn!("{}: {} does not parse as a version ({})", name, path.display(), e);
                    String::new()
                }
            },
            Err(e) => {
                log::warn!("{}: could not read {} ({})", name, path.display(), e);
                String::new()
            }
        };

        Module { name, path, rel_path, dir, current_version }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
    SingleModule,
    MultiModule,
    NoModules,
}

/// The resolved execution shape for a command invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub mode: ContextMode,
    pub single_path: Option<PathBuf>,
    pub modules: Vec<Module>,
}

impl Context {
    fn single(path: PathBuf) -> Context {
        Context { mode: ContextMode::SingleModule, single_path: Some(path), modules: Vec::new() }
    }

    fn multi(modules: Vec<Module>) -> Context {
        let mode = match modules.len() {
            0 => ContextMode::NoModules,
            1 => ContextMode::SingleModule,
            _ => ContextMode::MultiModule,
        };
        Context { mode, single_path: None, modules }
    }
}

/// Resolves a `Context` for `root`: a single module at the workspace root,
/// then explicitly configured modules, then recursive discovery -- the first
/// of these three that applies wins.
pub fn discover_context(
    root: &Path,
    fs: &dyn Filesystem,
    config: &WorkspaceConfig,
    cancel: &CancellationToken,
) -> Result<Context> {
    let root_version = root.join(VERSION_FILE_NAME);
    if fs.exists(&root_version, cancel) {
        log::debug!("{} resolved as a single module at the workspace root", root.display());
        return Ok(Context::single(root_version));
    }

    if !config.modules.is_empty() {
        let ctx = resolve_explicit_modules(root, &config.modules, fs, cancel)?;
        log::info!("{} explicit module(s) enabled in {}", ctx.modules.len(), root.display());
        return Ok(ctx);
    }

    if !config.discovery.enabled {
        log::debug!("discovery disabled for {}, yielding no modules", root.display());
        return Ok(Context::multi(Vec::new()));
    }

    let modules = recursive_discover(root, fs, config, cancel)?;
    log::info!("discovered {} module(s) under {}", modules.len(), root.display());
    Ok(Context::multi(modules))
}

fn resolve_explicit_modules(
    root: &Path,
    explicit: &[ExplicitModule],
    fs: &dyn Filesystem,
    cancel: &CancellationToken,
) -> Result<Context> {
    let mut modules = Vec::new();
    for m in explicit {
        if !m.enabled {
            continue;
        }
        let dir = if m.path.is_absolute() { m.path.clone() } else { root.join(&m.path) };
        if !fs.exists(&dir, cancel) {
            return Err(Error::NotFound(dir.display().to_string()));
        }
        let mut module = Module::at(root, dir, fs, cancel);
        module.name = m.name.clone();
        modules.push(module);
    }
    Ok(Context::multi(modules))
}

fn recursive_discover(
    root: &Path,
    fs: &dyn Filesystem,
    config: &WorkspaceConfig,
    cancel: &CancellationToken,
) -> Result<Vec<Module>> {
    let sleyignore_path = root.join(IGNORE_FILE_NAME);
    let sleyignore_contents = fs.read_file(&sleyignore_path, cancel).ok();
    let ignore = IgnoreSet::merged(&config.discovery.exclude, sleyignore_contents.as_deref());

    let mut modules = Vec::new();
    walk(root, root, 0, &config.discovery, &ignore, fs, cancel, &mut modules)?;
    modules.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(modules)
}

#[allow(clippy::too_many_arguments)]
fn walk(
    root: &Path,
    dir: &Path,
    depth: usize,
    discovery: &crate::config::DiscoveryConfig,
    ignore: &IgnoreSet,
    fs: &dyn Filesystem,
    cancel: &CancellationToken,
    out: &mut Vec<Module>,
) -> Result<()> {
    cancel.check()?;

    let entries = match fs.read_dir(dir, cancel) {
        Ok(entries) => entries,
        Err(e) if e.is_cancelled() => return Err(e),
        Err(_) => return Ok(()), // permission-robust: silently skip unreadable dirs
    };

    let mut sorted = entries;
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for entry in sorted {
        cancel.check()?;
        let rel = entry.path.strip_prefix(root).unwrap_or(&entry.path);
        let rel_str = rel.to_string_lossy();

        if ignore.matches(&entry.name) || ignore.matches(&rel_str) {
            continue;
        }

        match entry.kind {
            EntryKind::Dir => {
                if !discovery.recursive {
                    // non-recursive: only the root level is scanned, no descent at all
                    continue;
                }
                if depth + 1 > discovery.max_depth {
                    continue;
                }
                walk(root, &entry.path, depth + 1, discovery, ignore, fs, cancel, out)?;
            }
            EntryKind::File => {
                if entry.name == VERSION_FILE_NAME {
                    out.push(Module::at(root, dir.to_path_buf(), fs, cancel));
                }
            }
        }
    }

    Ok(())
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
    fn single_module_at_cwd_root() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_file("/ws/.version", "1.0.0\n");
        let cancel = CancellationToken::new();
        let ctx = discover_context(Path::new("/ws"), &fs, &cfg(), &cancel).unwrap();
        assert_eq!(ctx.mode, ContextMode::SingleModule);
        assert_eq!(ctx.single_path, Some(PathBuf::from("/ws/.version")));
    }

    #[test]
    fn discovery_applies_ignore_patterns() {
        let fs = MemoryFilesystem::new()
            .with_dir("/ws")
            .with_dir("/ws/a")
            .with_file("/ws/a/.version", "1.0.0\n")
            .with_dir("/ws/node_modules")
            .with_dir("/ws/node_modules/x")
            .with_file("/ws/node_modules/x/.version", "1.0.0\n")
            .with_dir("/ws/.git")
            .with_dir("/ws/.git/y")
            .with_file("/ws/.git/y/.version", "1.0.0\n")
            .with_dir("/ws/b")
            .with_dir("/ws/b/dist")
            .with_file("/ws/b/dist/.version", "1.0.0\n")
            .with_dir("/ws/c")
            .with_file("/ws/c/.version", "1.0.0\n");

        let cancel = CancellationToken::new();
        let ctx = discover_context(Path::new("/ws"), &fs, &cfg(), &cancel).unwrap();
        let mut names: Vec<_> = ctx.modules.iter().map(|m| m.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn unreadable_version_file_degrades_to_empty_current_version() {
        let fs = MemoryFilesystem::new()
            .with_dir("/ws")
            .with_dir("/ws/a")
            .with_file("/ws/a/.version", "1.0.0\n");
        fs.fail_on(
            "/ws/a/.version",
            "read_file",
            crate::error::Error::PermissionDenied { op: "read".into(), path: "/ws/a/.version".into() },
        );
        let cancel = CancellationToken::new();
        let ctx = discover_context(Path::new("/ws"), &fs, &cfg(), &cancel).unwrap();
        assert_eq!(ctx.modules.len(), 1);
        assert_eq!(ctx.modules[0].current_version, "");
    }

    #[test]
    fn max_depth_bounds_descent() {
        let fs = MemoryFilesystem::new()
            .with_dir("/ws")
            .with_dir("/ws/a")
            .with_dir("/ws/a/b")
            .with_file("/ws/a/b/.version", "1.0.0\n");
        let mut config = cfg();
        config.discovery.max_depth = 1;
        let cancel = CancellationToken::new();
        let ctx = discover_context(Path::new("/ws"), &fs, &config, &cancel).unwrap();
        assert!(ctx.modules.is_empty());
    }

    #[test]
    fn non_recursive_only_scans_root_level() {
        let fs = MemoryFilesystem::new()
            .with_dir("/ws")
            .with_file("/ws/.not-a-version-file", "")
            .with_dir("/ws/a")
            .with_file("/ws/a/.version", "1.0.0\n");
        let mut config = cfg();
        config.discovery.recursive = false;
        let cancel = CancellationToken::new();
        let ctx = discover_context(Path::new("/ws"), &fs, &config, &cancel).unwrap();
        assert!(ctx.modules.is_empty());
    }

    #[test]
    fn explicit_modules_suppress_recursive_discovery() {
        let fs = MemoryFilesystem::new()
            .with_dir("/ws")
            .with_dir("/ws/a")
            .with_file("/ws/a/.version", "1.0.0\n");
        let mut config = cfg();
        config.modules.push(ExplicitModule {
            name: "renamed".to_string(),
            path: PathBuf::from("a"),
            enabled: true,
        });
        let cancel = CancellationToken::new();
        let ctx = discover_context(Path::new("/ws"), &fs, &config, &cancel).unwrap();
        assert_eq!(ctx.modules.len(), 1);
        assert_eq!(ctx.modules[0].name, "renamed");
    }

    #[test]
    fn disabled_explicit_module_is_skipped() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_dir("/ws/a");
        let mut config = cfg();
        config.modules.push(ExplicitModule {
            name: "a".to_string(),
            path: PathBuf::from("a"),
            enabled: false,
        });
        let cancel = CancellationToken::new();
        let ctx = discover_context(Path::new("/ws"), &fs, &config, &cancel).unwrap();
        assert_eq!(ctx.mode, ContextMode::NoModules);
    }

    #[test]
    fn explicit_module_missing_path_is_an_error() {
        let fs = MemoryFilesystem::new().with_dir("/ws");
        let mut config = cfg();
        config.modules.push(ExplicitModule {
            name: "missing".to_string(),
            path: PathBuf::from("nope"),
            enabled: true,
        });
        let cancel = CancellationToken::new();
        assert!(discover_context(Path::new("/ws"), &fs, &config, &cancel).is_err());
    }
}
