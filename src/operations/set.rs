use crate::discovery::Module;
use crate::error::Result;
use crate::executor::{Operation, OperationContext};
use crate::semver::SemVersion;

use super::write_version;

/// Hard-sets a module's version to a caller-supplied value.
pub struct SetOperation {
    pub target: SemVersion,
}

impl SetOperation {
    pub fn new(target: SemVersion) -> Self {
        SetOperation { target }
    }
}

impl Operation for SetOperation {
    fn name(&self) -> &str {
        "set"
    }

    fn execute(&self, ctx: &OperationContext, module: &mut Module) -> Result<()> {
        write_version(ctx, &module.path, &self.target)?;
        log::trace!("{}: version forced to {}", module.name, self.target.render());
        module.current_version = self.target.render();
        Ok(())
    }
}
