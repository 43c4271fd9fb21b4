use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};

use camino::Utf8PathBuf;
use clap::Parser;
use const_format::concatcp;
use eyre::{bail, Result as EyreResult, WrapErr};
use hwemu_model::{render_ini, ConfigGenerator, SectionStyle};
use serde::Serialize;

use crate::cli::Environment;
use crate::output::{InfoLine, Report};

pub const EXAMPLES: &str = r"
  $ hwectl random-ini random.ini
  $ hwectl random-ini --seed 42 --extern-names random.ini
";

#[derive(Debug, Parser)]
#[command(about = "Write a random valid configuration file")]
#[command(after_help = concatcp!("Examples:", EXAMPLES))]
pub struct RandomIniCommand {
    /// Output file, must not exist yet
    #[arg(value_name = "FILE")]
    pub file: Utf8PathBuf,

    /// Seed for a reproducible configuration
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Use external device names (`[ttyHWE0]`) as section headers
    #[arg(long)]
    pub extern_names: bool,
}

#[derive(Debug, Serialize)]
struct Generated {
    file: Utf8PathBuf,
    seed: u64,
    devices: usize,
    pairs: usize,
}

impl Report for Generated {
    fn report(&self) {
        InfoLine(&format!(
            "wrote {} (seed {}): {} device(s), {} pair(s)",
            self.file, self.seed, self.devices, self.pairs
        ))
        .report();
    }
}

impl RandomIniCommand {
    pub fn run(self, environment: &Environment) -> EyreResult<()> {
        if self.file.exists() {
            bail!("{} already exists, refusing to overwrite it", self.file);
        }

        let seed = self.seed.unwrap_or_else(rand::random);
        let extern_names = self.extern_names || environment.config.generator.extern_names;

        let mut generator =
            ConfigGenerator::from_seed(environment.profile, seed).with_extern_names(extern_names);

        if let Some(limits) = environment.config.generator.limits {
            generator = generator.with_limits(limits)?;
        }

        let config = generator.generate();

        let style = if extern_names {
            SectionStyle::ExternName
        } else {
            SectionStyle::DeviceName
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&self.file) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                bail!("{} already exists, refusing to overwrite it", self.file);
            }
            Err(err) => {
                return Err(err).wrap_err_with(|| format!("failed to create {}", self.file));
            }
        };

        file.write_all(render_ini(&config, style).as_bytes())
            .wrap_err_with(|| format!("failed to write {}", self.file))?;

        environment.output.write(&Generated {
            seed,
            devices: config.device_count(),
            pairs: config.pair_count(),
            file: self.file,
        });

        Ok(())
    }
}
