use clap::Parser;
use eyre::Result as EyreResult;

use crate::cli::Environment;
use crate::output::InfoLine;

#[derive(Clone, Copy, Debug, Parser)]
#[command(about = "Remove every device, leaving the module loaded")]
pub struct EraseCommand;

impl EraseCommand {
    pub fn run(self, environment: &Environment) -> EyreResult<()> {
        let tree = environment.tree();
        let before: usize = tree.device_count()?.values().sum();

        tree.erase()?;

        environment
            .output
            .write(&InfoLine(&format!("erased {before} device(s)")));

        Ok(())
    }
}
