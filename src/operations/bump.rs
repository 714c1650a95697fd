use crate::discovery::Module;
use crate::error::Result;
use crate::executor::{Operation, OperationContext};
use crate::extensions::Hook;

use super::{invalid_bump_type, read_version, run_hook, write_version};

/// The closed set of bump-kind tokens: anything outside this set is rejected
/// with `InvalidBumpType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Patch,
    Minor,
    Major,
    /// Strips pre-release unconditionally; `preserve_metadata` controls
    /// whether build metadata survives the transition alongside it.
    Release { preserve_metadata: bool },
    /// Drops the pre-release if present, otherwise bumps the patch.
    Auto,
}

impl BumpKind {
    pub fn parse(token: &str) -> Result<BumpKind> {
        match token {
            "patch" => Ok(BumpKind::Patch),
            "minor" => Ok(BumpKind::Minor),
            "major" => Ok(BumpKind::Major),
            "release" => Ok(BumpKind::Release { preserve_metadata: false }),
            "release-preserve-metadata" => Ok(BumpKind::Release { preserve_metadata: true }),
            "auto" => Ok(BumpKind::Auto),
            other => Err(invalid_bump_type(other)),
        }
    }

    /// The canonical token for this kind, the inverse of `parse` and the
    /// value reported to extension hooks as `bump_type`.
    pub fn token(&self) -> &'static str {
        match self {
            BumpKind::Patch => "patch",
            BumpKind::Minor => "minor",
            BumpKind::Major => "major",
            BumpKind::Release { preserve_metadata: false } => "release",
            BumpKind::Release { preserve_metadata: true } => "release-preserve-metadata",
            BumpKind::Auto => "auto",
        }
    }
}

/// Applies a deterministic SemVer transformation and writes the result back.
pub struct BumpOperation {
    pub kind: BumpKind,
}

impl BumpOperation {
    pub fn new(kind: BumpKind) -> Self {
        BumpOperation { kind }
    }
}

impl Operation for BumpOperation {
    fn name(&self) -> &str {
        "bump"
    }

    fn execute(&self, ctx: &OperationContext, module: &mut Module) -> Result<()> {
        let current = read_version(ctx, &module.path)?;
        let next = match self.kind {
            BumpKind::Patch => current.bump_patch(),
            BumpKind::Minor => current.bump_minor(),
            BumpKind::Major => current.bump_major(),
            BumpKind::Release { preserve_metadata } => current.bump_release(preserve_metadata),
            BumpKind::Auto => current.next_auto()?,
        };
        run_hook(ctx, module, Hook::PreBump, &next, Some(&current), Some(self.kind.token()), None)?;
        write_version(ctx, &module.path, &next)?;
        log::trace!("{}: version {} -> {}", module.name, current.render(), next.render());
        module.current_version = next.render();
        run_hook(ctx, module, Hook::PostBump, &next, Some(&current), Some(self.kind.token()), None)?;
        Ok(())
    }
}
