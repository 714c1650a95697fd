use crate::discovery::Module;
use crate::error::Result;
use crate::executor::{Operation, OperationContext};
use crate::extensions::Hook;

use super::{read_version, run_hook};

/// Parses a module's `.version` file and fails with `InvalidVersion` if it
/// does not conform to the SemVer 2.0.0 grammar. Never mutates the file.
pub struct ValidateOperation;

impl Operation for ValidateOperation {
    fn name(&self) -> &str {
        "validate"
    }

    fn execute(&self, ctx: &OperationContext, module: &mut Module) -> Result<()> {
        let version = read_version(ctx, &module.path)?;
        module.current_version = version.render();
        run_hook(ctx, module, Hook::Validate, &version, None, None, None)?;
        Ok(())
    }
}
