use camino::Utf8PathBuf;
use clap::Parser;
use const_format::concatcp;
use eyre::{Result as EyreResult, WrapErr};
use hwemu_model::load_file;
use serde::Serialize;
use tracing::info;

use crate::cli::Environment;
use crate::output::{InfoLine, Report, WarnLine};
use crate::system::{ensure_root, exposed_devices, missing_groups, ExposedDevice};

pub const EXAMPLES: &str = r"
  $ sudo hwectl start devices.ini
  $ sudo hwectl --profile vcpsim start sensors.ini
";

#[derive(Debug, Parser)]
#[command(about = "Load the kernel module and create the devices of a configuration file")]
#[command(after_help = concatcp!("Examples:", EXAMPLES))]
pub struct StartCommand {
    /// INI file describing the devices
    #[arg(value_name = "FILE")]
    pub file: Utf8PathBuf,
}

#[derive(Debug, Serialize)]
struct Started {
    module: &'static str,
    devices: usize,
    pairs: usize,
    exposed: Vec<ExposedDevice>,
}

impl Report for Started {
    fn report(&self) {
        InfoLine(&format!(
            "{} loaded with {} device(s), {} pair(s)",
            self.module, self.devices, self.pairs
        ))
        .report();

        for exposed in &self.exposed {
            InfoLine(&format!("{} -> {}", exposed.device, exposed.path)).report();
        }
    }
}

impl StartCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        ensure_root()?;

        let config = load_file(environment.profile, &self.file)?;
        let module = environment.module();

        if module.is_loaded().await? {
            info!(module = module.name(), "module already loaded, replacing it");
            environment.teardown().await;
        }

        module.load().await?;

        if let Err(err) = environment.tree().write(&config) {
            environment.teardown().await;
            return Err(err).wrap_err_with(|| format!("failed to apply {}", self.file));
        }

        let exposed = exposed_devices(&environment.config.watch.dev_dir, &environment.profile).await?;

        environment.output.write(&Started {
            module: module.name(),
            devices: config.device_count(),
            pairs: config.pair_count(),
            exposed,
        });

        let missing = missing_groups(&environment.config.module.groups).await?;

        if !missing.is_empty() {
            let user = std::env::var("SUDO_USER").unwrap_or_default();
            environment.output.write(&WarnLine(&format!(
                "{user} is not in group(s) {}; run `usermod -aG {} {user}` to access the devices",
                missing.join(", "),
                missing.join(","),
            )));
        }

        Ok(())
    }
}
