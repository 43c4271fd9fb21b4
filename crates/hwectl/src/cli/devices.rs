use clap::Parser;
use eyre::Result as EyreResult;
use serde::Serialize;

use crate::cli::Environment;
use crate::output::{InfoLine, Report};
use crate::system::{exposed_devices, ExposedDevice};

#[derive(Clone, Copy, Debug, Parser)]
#[command(about = "List the device nodes the module exposes")]
pub struct DevicesCommand;

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct Listed(Vec<ExposedDevice>);

impl Report for Listed {
    fn report(&self) {
        if self.0.is_empty() {
            InfoLine("no devices").report();
        }

        for exposed in &self.0 {
            println!("{}\t{}", exposed.device, exposed.path);
        }
    }
}

impl DevicesCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        let devices = exposed_devices(&environment.config.watch.dev_dir, &environment.profile).await?;

        environment.output.write(&Listed(devices));

        Ok(())
    }
}
