use crate::discovery::Module;
use crate::error::Result;
use crate::executor::{Operation, OperationContext};

use super::read_version;

/// Re-reads a module's `.version` file and refreshes `current_version`.
/// Never mutates the file; `old_version == new_version` on success.
pub struct ShowOperation;

impl Operation for ShowOperation {
    fn name(&self) -> &str {
        "show"
    }

    fn execute(&self, ctx: &OperationContext, module: &mut Module) -> Result<()> {
        let version = read_version(ctx, &module.path)?;
        module.current_version = version.render();
        Ok(())
    }
}
