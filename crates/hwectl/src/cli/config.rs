use clap::Parser;
use eyre::{OptionExt, Result as EyreResult};
use serde::Serialize;

use crate::cli::Environment;
use crate::output::{InfoLine, Report};

/// Prints the effective settings, command-line overrides included.
#[derive(Debug, Parser)]
pub struct ConfigCommand {
    /// Print a single value, e.g. `module.revision`
    #[arg(long, value_name = "KEY", conflicts_with = "save")]
    pub get: Option<String>,

    /// Write the effective settings to the settings file
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
struct Value<'a> {
    key: &'a str,
    value: String,
}

impl Report for Value<'_> {
    fn report(&self) {
        println!("{}", self.value);
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct Settings<'a> {
    config: &'a hwemu_config::ConfigFile,
    #[serde(skip)]
    toml: String,
}

impl Report for Settings<'_> {
    fn report(&self) {
        print!("{}", self.toml);
    }
}

impl ConfigCommand {
    pub fn run(self, environment: &Environment) -> EyreResult<()> {
        let config = &environment.config;

        if let Some(key) = &self.get {
            let value = config
                .get_value(key)
                .ok_or_eyre(format!("{key} is not set or not a known key"))?;

            environment.output.write(&Value { key, value });
            return Ok(());
        }

        if self.save {
            config.save(&environment.config_path)?;

            environment.output.write(&InfoLine(&format!(
                "settings saved to {}",
                environment.config_path
            )));
            return Ok(());
        }

        environment.output.write(&Settings {
            config,
            toml: config.to_toml()?,
        });

        Ok(())
    }
}
