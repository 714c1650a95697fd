//! Extension hook runtime: sandboxed out-of-process script invocation
//! exchanging JSON messages at defined lifecycle points (pre-bump, post-bump,
//! pre-release, validate).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fs::Filesystem;

pub const MANIFEST_FILE_NAME: &str = "extension.yaml";

/// Output captured from a child process is bounded at 1 MiB -- exceeding the
/// bound is an error, not a silent truncation.
pub const MAX_STDOUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    PreBump,
    PostBump,
    PreRelease,
    Validate,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::PreBump => "pre-bump",
            Hook::PostBump => "post-bump",
            Hook::PreRelease => "pre-release",
            Hook::Validate => "validate",
        }
    }
}

/// `{name, version, description, author, repository, entry, hooks}`. All
/// fields except `hooks` are mandatory; the manifest is rejected if any is
/// empty.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub repository: String,
    pub entry: PathBuf,
    #[serde(default)]
    pub hooks: Vec<String>,
}

impl Manifest {
    pub fn validate(&self) -> Result<()> {
        let fields: [(&str, &str); 5] = [
            ("name", &self.name),
            ("version", &self.version),
            ("description", &self.description),
            ("author", &self.author),
            ("repository", &self.repository),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("extension manifest missing {}", field)));
            }
        }
        if self.entry.as_os_str().is_empty() {
            return Err(Error::Config("extension manifest missing entry".to_string()));
        }
        Ok(())
    }

    pub fn subscribes_to(&self, hook: Hook) -> bool {
        self.hooks.iter().any(|h| h == hook.as_str())
    }
}

/// Loads and validates the manifest of every extension `config` enables,
/// producing the `(name, directory, Manifest)` triples
/// `ExtensionRuntime::run_chain` consumes. Each extension's path is resolved
/// relative to `root` unless already absolute.
pub fn resolve_extensions(
    root: &Path,
    config: &Config,
    fs: &dyn Filesystem,
    cancel: &CancellationToken,
) -> Result<Vec<(String, PathBuf, Manifest)>> {
    let mut resolved = Vec::new();
    for ext in config.enabled_extensions() {
        let dir = if ext.path.is_absolute() { ext.path.clone() } else { root.join(&ext.path) };
        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        let contents = fs.read_file(&manifest_path, cancel)?;
        let manifest: Manifest = serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", manifest_path.display(), e)))?;
        manifest.validate()?;
        resolved.push((ext.name.clone(), dir, manifest));
    }
    Ok(resolved)
}

/// Wire-format record crossing the process boundary to an extension.
#[derive(Debug, Clone, Serialize)]
pub struct HookInput {
    pub hook: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bump_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub project_root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
}

/// Wire-format record returned by an extension.
#[derive(Debug, Clone, Deserialize)]
pub struct HookOutput {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<HashMap<String, Value>>,
}

/// Resolves `entry` relative to `extension_dir` and rejects any path whose
/// lexical form would escape it. This runs before any syscall, including on
/// paths that don't exist yet, so it cannot by itself catch a symlink inside
/// `extension_dir` that *dereferences* outside it -- `reject_symlink_escape`
/// closes that gap once the path is known to exist.
fn resolve_entry(extension_dir: &Path, entry: &Path) -> Result<PathBuf> {
    let candidate = extension_dir.join(entry);
    let normalized = normalize_lexically(&candidate);
    let root = normalize_lexically(extension_dir);
    if !normalized.starts_with(&root) {
        return Err(Error::PathValidation { path: candidate, root });
    }
    Ok(normalized)
}

/// Re-verifies containment against the canonicalized (symlink-resolved) real
/// path, right before the entry is stat'd and spawned. A symlink placed
/// inside `extension_dir` that points outside it passes the lexical check in
/// `resolve_entry` (no `..` appears in the request) but fails here once the
/// real target is known.
fn reject_symlink_escape(extension_dir: &Path, resolved: &Path) -> Result<PathBuf> {
    let canonical_root = std::fs::canonicalize(extension_dir)
        .map_err(|_| Error::PathValidation { path: resolved.to_path_buf(), root: extension_dir.to_path_buf() })?;
    let canonical_entry = std::fs::canonicalize(resolved)
        .map_err(|_| Error::NotFound(resolved.display().to_string()))?;
    if !canonical_entry.starts_with(&canonical_root) {
        return Err(Error::PathValidation { path: canonical_entry, root: canonical_root });
    }
    Ok(canonical_entry)
}

/// Lexical `..`/`.` resolution without touching the filesystem -- we need to
/// reject traversal *before* any syscall, including on paths that don't
/// exist yet.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        use std::path::Component::*;
        match component {
            ParentDir => {
                out.pop();
            }
            CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub struct ExtensionRuntime {
    timeout: Duration,
}

impl Default for ExtensionRuntime {
    fn default() -> Self {
        ExtensionRuntime { timeout: DEFAULT_TIMEOUT }
    }
}

impl ExtensionRuntime {
    pub fn new(timeout: Duration) -> Self {
        ExtensionRuntime { timeout }
    }

    /// Invokes one extension for one hook point, enforcing the sandbox that
    /// keeps the spawned entry inside `extension_dir`.
    pub fn invoke(
        &self,
        extension_name: &str,
        extension_dir: &Path,
        entry: &Path,
        input: &HookInput,
        cancel: &CancellationToken,
    ) -> Result<HookOutput> {
        cancel.check()?;
        log::debug!("invoking extension {} for hook {}", extension_name, input.hook);

        // Path-traversal and stat failures are reported as their own kind --
        // only failures of the script *itself* (spawn, timeout, malformed or
        // unsuccessful output) are wrapped as `Error::Extension`.
        let resolved = resolve_entry(extension_dir, entry)?;
        let resolved = reject_symlink_escape(extension_dir, &resolved)?;

        let meta = std::fs::metadata(&resolved)
            .map_err(|_| Error::NotFound(resolved.display().to_string()))?;
        if meta.is_dir() {
            return Err(Error::InvalidInput(format!("{} is a directory", resolved.display())));
        }
        if !is_executable(&meta) {
            return Err(Error::InvalidInput(format!("{} is not executable", resolved.display())));
        }

        let payload = serde_json::to_vec(input)
            .map_err(|e| wrap(extension_name, input.hook.clone(), Error::Config(e.to_string())))?;

        let mut child = Command::new(&resolved)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| wrap(extension_name, input.hook.clone(), Error::file_op("spawn", &resolved, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(&payload);
        }

        let mut stdout = child.stdout.take().expect("stdout was piped");
        let mut stderr = child.stderr.take().expect("stderr was piped");

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            // Read one byte past the cap so the caller can distinguish
            // "exactly at the limit" from "overflowed it" without buffering
            // an unbounded amount of malicious output.
            let mut buf = Vec::new();
            let _ = stdout.take(MAX_STDOUT_BYTES as u64 + 1).read_to_end(&mut buf);
            let _ = tx.send(buf);
        });

        let deadline = Instant::now() + self.timeout;
        let captured = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(wrap(extension_name, input.hook.clone(), Error::Cancelled));
            }
            match rx.recv_timeout(Duration::from_millis(25)) {
                Ok(buf) => break buf,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(wrap(extension_name, input.hook.clone(), Error::Timeout(self.timeout)));
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break Vec::new(),
            }
        };

        if captured.len() > MAX_STDOUT_BYTES {
            let _ = child.kill();
            let _ = child.wait();
            return Err(wrap(
                extension_name,
                input.hook.clone(),
                Error::InvalidInput(format!("extension output exceeded {} bytes", MAX_STDOUT_BYTES)),
            ));
        }

        let mut stderr_buf = String::new();
        let _ = stderr.read_to_string(&mut stderr_buf);
        if !stderr_buf.trim().is_empty() {
            log::warn!("extension {} wrote to stderr: {}", extension_name, tail(&stderr_buf, 2000));
        }

        let status = child
            .wait()
            .map_err(|e| wrap(extension_name, input.hook.clone(), Error::file_op("wait", &resolved, e)))?;

        let parsed: HookOutput = serde_json::from_slice(&captured).map_err(|_| {
            wrap(
                extension_name,
                input.hook.clone(),
                Error::InvalidInput(format!(
                    "malformed hook output (exit {:?}); stderr: {}",
                    status.code(),
                    tail(&stderr_buf, 2000)
                )),
            )
        })?;

        if !parsed.success {
            return Err(wrap(
                extension_name,
                input.hook.clone(),
                Error::InvalidInput(parsed.message.clone().unwrap_or_else(|| "extension reported failure".to_string())),
            ));
        }

        log::info!("extension {} completed hook {} successfully", extension_name, input.hook);
        Ok(parsed)
    }

    /// Runs every enabled subscriber for `hook` in configuration order,
    /// strictly sequentially within one module's lifecycle.
    pub fn run_chain(
        &self,
        hook: Hook,
        extensions: &[(String, PathBuf, Manifest)],
        input: &HookInput,
        cancel: &CancellationToken,
    ) -> Result<Vec<HookOutput>> {
        log::debug!("running {} chain against {} configured extension(s)", hook.as_str(), extensions.len());
        let mut outputs = Vec::new();
        for (name, dir, manifest) in extensions {
            cancel.check()?;
            if !manifest.subscribes_to(hook) {
                continue;
            }
            outputs.push(self.invoke(name, dir, &manifest.entry, input, cancel)?);
        }
        Ok(outputs)
    }
}

fn wrap(extension: &str, operation: String, source: Error) -> Error {
    Error::Extension { extension: extension.to_string(), operation, source: Box::new(source) }
}

fn tail(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().skip(s.chars().count() - max_chars).collect()
    }
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}
