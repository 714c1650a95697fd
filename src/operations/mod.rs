//! Thin per-operation consumers of the SemVer engine and filesystem
//! abstraction, run by the executor. Each implements `executor::Operation`
//! and is contracted to leave `module.current_version` holding the
//! post-execution rendering on success.

pub mod bump;
pub mod pre;
pub mod set;
pub mod show;
pub mod validate;

pub use bump::{BumpKind, BumpOperation};
pub use pre::{PreMode, PreOperation};
pub use set::SetOperation;
pub use show::ShowOperation;
pub use validate::ValidateOperation;

use std::path::Path;

use crate::discovery::Module;
use crate::error::{Error, Result};
use crate::executor::OperationContext;
use crate::extensions::{Hook, HookInput};
use crate::semver::SemVersion;

const VERSION_FILE_PERM: u32 = 0o600;

/// Reads and parses the module's `.version` file. Shared by every operation
/// that needs the authoritative on-disk value rather than the (possibly
/// stale) `current_version` cached at discovery.
fn read_version(ctx: &OperationContext, path: &Path) -> Result<SemVersion> {
    let contents = ctx.fs.read_file(path, ctx.cancel)?;
    SemVersion::parse(contents.trim())
}

/// Writes `version` in canonical form, trailing newline, owner-read/write
/// permissions.
fn write_version(ctx: &OperationContext, path: &Path, version: &SemVersion) -> Result<()> {
    let rendered = format!("{}\n", version.render());
    ctx.fs.write_file(path, &rendered, VERSION_FILE_PERM, ctx.cancel)
}

fn invalid_bump_type(token: &str) -> Error {
    Error::InvalidBumpType(token.to_string())
}

/// Runs every extension subscribed to `hook` against `module`, a no-op when
/// the context carries no hook runtime. `bump_type`/`prerelease` are only
/// populated by the operations that have a meaningful value to report.
#[allow(clippy::too_many_arguments)]
fn run_hook(
    ctx: &OperationContext,
    module: &Module,
    hook: Hook,
    version: &SemVersion,
    previous_version: Option<&SemVersion>,
    bump_type: Option<&str>,
    prerelease: Option<&str>,
) -> Result<()> {
    let hooks = match &ctx.hooks {
        Some(h) => h,
        None => return Ok(()),
    };
    let input = HookInput {
        hook: hook.as_str().to_string(),
        version: version.render(),
        previous_version: previous_version.map(|v| v.render()),
        bump_type: bump_type.map(|s| s.to_string()),
        prerelease: prerelease.map(|s| s.to_string()),
        metadata: None,
        project_root: hooks.project_root.display().to_string(),
        module_dir: Some(module.dir.display().to_string()),
        module_name: Some(module.name.clone()),
    };
    hooks.runtime.run_chain(hook, hooks.extensions, &input, ctx.cancel)?;
    Ok(())
}
