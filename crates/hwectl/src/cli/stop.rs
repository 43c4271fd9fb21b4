use clap::Parser;
use eyre::Result as EyreResult;
use tracing::warn;

use crate::cli::Environment;
use crate::output::InfoLine;
use crate::system::ensure_root;

#[derive(Clone, Copy, Debug, Parser)]
#[command(about = "Remove every device and unload the kernel module")]
pub struct StopCommand;

impl StopCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        ensure_root()?;

        let module = environment.module();

        if !module.is_loaded().await? {
            environment
                .output
                .write(&InfoLine(&format!("{} is not loaded", module.name())));
            return Ok(());
        }

        if let Err(err) = environment.tree().erase() {
            warn!(error = %err, "erase failed, unloading anyway");
        }

        module.unload().await?;

        environment
            .output
            .write(&InfoLine(&format!("{} unloaded", module.name())));

        Ok(())
    }
}
