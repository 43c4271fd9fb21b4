use camino::Utf8PathBuf;
use clap::Parser;
use const_format::concatcp;
use eyre::Result as EyreResult;
use hwemu_model::{load_file, pretty};
use hwemu_primitives::Revision;
use serde::Serialize;

use crate::cli::Environment;
use crate::output::{InfoLine, Report};

pub const EXAMPLES: &str = r"
  $ hwectl check-ini devices.ini
  $ hwectl --profile vcpsim --output-format json check-ini sensors.ini
";

#[derive(Debug, Parser)]
#[command(about = "Validate a configuration file without touching the module")]
#[command(after_help = concatcp!("Examples:", EXAMPLES))]
pub struct CheckIniCommand {
    #[arg(value_name = "FILE")]
    pub file: Utf8PathBuf,
}

#[derive(Debug, Serialize)]
struct Checked {
    file: Utf8PathBuf,
    revision: Revision,
    devices: usize,
    pairs: usize,
    #[serde(skip)]
    summary: String,
}

impl Report for Checked {
    fn report(&self) {
        InfoLine(&format!(
            "{} is valid for {}: {} device(s), {} pair(s)",
            self.file, self.revision, self.devices, self.pairs
        ))
        .report();
        print!("{}", self.summary);
    }
}

impl CheckIniCommand {
    pub fn run(self, environment: &Environment) -> EyreResult<()> {
        let config = load_file(environment.profile, &self.file)?;

        environment.output.write(&Checked {
            revision: environment.profile.revision,
            devices: config.device_count(),
            pairs: config.pair_count(),
            summary: pretty(&config),
            file: self.file,
        });

        Ok(())
    }
}
