use camino::Utf8PathBuf;
use clap::Parser;
use eyre::Result as EyreResult;
use hwemu_model::{load_file, pretty};
use tracing::debug;

use crate::cli::Environment;
use crate::output::InfoLine;
use crate::system::ensure_root;

/// Like `start`, without replacing a loaded module or cleaning up after a
/// failed write, so the partial state can be inspected.
#[derive(Debug, Parser)]
pub struct DebugCommand {
    #[arg(value_name = "FILE")]
    pub file: Utf8PathBuf,
}

impl DebugCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        ensure_root()?;

        let module = environment.module();

        if !module.is_loaded().await? {
            module.load().await?;
        }

        let config = load_file(environment.profile, &self.file)?;

        debug!(summary = %pretty(&config), "writing");

        environment.tree().write(&config)?;

        environment
            .output
            .write(&InfoLine(&format!(
                "{} written: {} device(s), {} pair(s)",
                self.file,
                config.device_count(),
                config.pair_count()
            )));

        Ok(())
    }
}
