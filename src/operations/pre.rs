use crate::discovery::Module;
use crate::error::Result;
use crate::executor::{Operation, OperationContext};
use crate::extensions::Hook;
use crate::semver::increment_pre_release;

use super::{read_version, run_hook, write_version};

/// How `PreOperation` derives the next pre-release identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreMode {
    /// Replaces the pre-release identifier outright, leaving the numeric
    /// triple and build metadata untouched.
    Set(String),
    /// Increments the trailing numeric of the current pre-release against
    /// `label`, per the heuristic in `semver::increment_pre_release`.
    Bump(String),
}

/// Sets or bumps a module's pre-release identifier without touching the
/// numeric triple.
pub struct PreOperation {
    pub mode: PreMode,
}

impl PreOperation {
    pub fn new(mode: PreMode) -> Self {
        PreOperation { mode }
    }
}

impl Operation for PreOperation {
    fn name(&self) -> &str {
        "pre"
    }

    fn execute(&self, ctx: &OperationContext, module: &mut Module) -> Result<()> {
        let mut current = read_version(ctx, &module.path)?;
        let previous = current.clone();
        current.pre_release = match &self.mode {
            PreMode::Set(label) => label.clone(),
            PreMode::Bump(label) => increment_pre_release(&current.pre_release, label),
        };
        run_hook(ctx, module, Hook::PreRelease, &current, Some(&previous), None, Some(&current.pre_release))?;
        write_version(ctx, &module.path, &current)?;
        log::trace!("{}: pre-release {:?} -> {:?}", module.name, previous.pre_release, current.pre_release);
        module.current_version = current.render();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::fs::MemoryFilesystem;
    use std::path::PathBuf;

    fn module() -> Module {
        Module {
            name: "ws".to_string(),
            path: PathBuf::from("/ws/.version"),
            rel_path: PathBuf::new(),
            dir: PathBuf::from("/ws"),
            current_version: String::new(),
        }
    }

    #[test]
    fn set_replaces_pre_release_label() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_file("/ws/.version", "1.2.3\n");
        let cancel = CancellationToken::new();
        let ctx = OperationContext { fs: &fs, cancel: &cancel, hooks: None };
        let mut m = module();
        PreOperation::new(PreMode::Set("beta".to_string())).execute(&ctx, &mut m).unwrap();
        assert_eq!(m.current_version, "1.2.3-beta");
    }

    #[test]
    fn bump_increments_existing_numeric_suffix() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_file("/ws/.version", "1.2.3-beta.1\n");
        let cancel = CancellationToken::new();
        let ctx = OperationContext { fs: &fs, cancel: &cancel, hooks: None };
        let mut m = module();
        PreOperation::new(PreMode::Bump("beta".to_string())).execute(&ctx, &mut m).unwrap();
        assert_eq!(m.current_version, "1.2.3-beta.2");
    }

    #[test]
    fn bump_on_release_version_starts_at_one() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_file("/ws/.version", "1.2.3\n");
        let cancel = CancellationToken::new();
        let ctx = OperationContext { fs: &fs, cancel: &cancel, hooks: None };
        let mut m = module();
        PreOperation::new(PreMode::Bump("rc".to_string())).execute(&ctx, &mut m).unwrap();
        assert_eq!(m.current_version, "1.2.3-rc.1");
    }

    #[test]
    fn bump_with_mismatched_label_resets_to_one() {
        let fs = MemoryFilesystem::new().with_dir("/ws").with_file("/ws/.version", "1.2.3-alpha.3\n");
        let cancel = CancellationToken::new();
        let ctx = OperationContext { fs: &fs, cancel: &cancel, hooks: None };
        let mut m = module();
        PreOperation::new(PreMode::Bump("beta".to_string())).execute(&ctx, &mut m).unwrap();
        assert_eq!(m.current_version, "1.2.3-beta.1");
    }
}
