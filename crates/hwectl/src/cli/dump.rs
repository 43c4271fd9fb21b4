use clap::Parser;
use eyre::Result as EyreResult;
use hwemu_model::{pretty, serialize, Configuration};
use serde::Serialize;

use crate::cli::Environment;
use crate::output::Report;

#[derive(Clone, Copy, Debug, Parser)]
#[command(about = "Read the devices back from the module")]
pub struct DumpCommand {
    /// Print a summary instead of the canonical form
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct Dumped {
    config: Configuration,
    #[serde(skip)]
    pretty: bool,
}

impl Report for Dumped {
    fn report(&self) {
        if self.pretty {
            print!("{}", pretty(&self.config));
        } else {
            print!("{}", serialize(&self.config));
        }
    }
}

impl DumpCommand {
    pub fn run(self, environment: &Environment) -> EyreResult<()> {
        let config = environment.tree().read()?;

        environment.output.write(&Dumped {
            config,
            pretty: self.pretty,
        });

        Ok(())
    }
}
