use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use color_eyre::owo_colors::OwoColorize;
use const_format::concatcp;
use eyre::{Report as EyreReport, Result as EyreResult};
use hwemu_config::{ConfigFile, CONFIG_FILE};
use hwemu_model::ComparisonMismatch;
use hwemu_primitives::{Profile, Revision};
use hwemu_sysfs::{default_base, HostFs, ProtocolError, SysfsTree};
use serde::{Serialize, Serializer};
use thiserror::Error as ThisError;
use tracing::warn;

use crate::defaults;
use crate::output::{Format, Output, Report};
use crate::system::KernelModule;

mod check_ini;
mod config;
mod debug;
mod devices;
mod dump;
mod erase;
mod random_ini;
mod roundtrip;
mod start;
mod stop;
mod watch;

use check_ini::CheckIniCommand;
use config::ConfigCommand;
use debug::DebugCommand;
use devices::DevicesCommand;
use dump::DumpCommand;
use erase::EraseCommand;
use random_ini::RandomIniCommand;
use roundtrip::RoundtripCommand;
use start::StartCommand;
use stop::StopCommand;
use watch::WatchCommand;

pub const EXAMPLES: &str = r"
  # Load the module with a set of emulated devices
  $ sudo hwectl start devices.ini

  # Validate a file without touching the module
  $ hwectl check-ini devices.ini

  # Write, read back and compare 100 random configurations
  $ sudo hwectl --profile vcpsim roundtrip --repeats 100

  # Remove every device and unload the module
  $ sudo hwectl stop
";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(after_help = concatcp!(
    "Environment variables:\n",
    "  HWEMU_HOME    Directory holding ", CONFIG_FILE, "\n",
    "  RUST_LOG      Log filter (default: hwectl=info,hwemu_=info)\n\n",
    "Examples:",
    EXAMPLES
))]
pub struct RootCommand {
    #[command(flatten)]
    pub args: RootArgs,

    #[command(subcommand)]
    pub action: SubCommands,
}

#[derive(Debug, Subcommand)]
pub enum SubCommands {
    Start(StartCommand),
    Stop(StopCommand),
    #[command(hide = true)]
    Debug(DebugCommand),
    CheckIni(CheckIniCommand),
    RandomIni(RandomIniCommand),
    Dump(DumpCommand),
    Erase(EraseCommand),
    Roundtrip(RoundtripCommand),
    Devices(DevicesCommand),
    Watch(WatchCommand),
    Config(ConfigCommand),
}

#[derive(Debug, Parser)]
pub struct RootArgs {
    /// Directory holding the settings file
    #[arg(long, value_name = "PATH", default_value_t = defaults::default_home())]
    #[arg(env = "HWEMU_HOME", hide_env_values = true)]
    pub home: Utf8PathBuf,

    /// Settings file, instead of <home>/hwectl.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Kernel module revision to drive
    #[arg(long, value_name = "REVISION")]
    pub profile: Option<Revision>,

    /// Sysfs directory of the module, instead of /sys/kernel/<module>
    #[arg(long, value_name = "PATH")]
    pub base: Option<Utf8PathBuf>,

    #[arg(long, value_name = "FORMAT", default_value_t, value_enum)]
    pub output_format: Format,
}

#[derive(Debug)]
pub struct Environment {
    pub output: Output,
    /// Settings with command-line overrides applied.
    pub config: ConfigFile,
    pub config_path: Utf8PathBuf,
    pub profile: Profile,
}

impl Environment {
    pub fn new(args: RootArgs, output: Output) -> EyreResult<Self> {
        let config_path = args
            .config
            .unwrap_or_else(|| args.home.join(CONFIG_FILE));

        let mut config = ConfigFile::load_or_default(&config_path)?;

        if let Some(revision) = args.profile {
            config.module.revision = revision;
        }

        if let Some(base) = args.base {
            config.module.sysfs_base = Some(base);
        }

        Ok(Self {
            output,
            profile: config.module.revision.profile(),
            config,
            config_path,
        })
    }

    pub fn base(&self) -> Utf8PathBuf {
        self.config
            .module
            .sysfs_base
            .clone()
            .unwrap_or_else(|| default_base(&self.profile))
    }

    pub fn tree(&self) -> SysfsTree<HostFs> {
        SysfsTree::new(self.base(), self.profile, HostFs)
    }

    pub fn module(&self) -> KernelModule {
        KernelModule::new(&self.profile, &self.config.module.search_dirs)
    }

    /// Removes every device and unloads the module. Failures are logged,
    /// never raised, so they cannot mask the error that led here.
    pub async fn teardown(&self) {
        let module = self.module();

        if let Err(err) = self.tree().erase() {
            warn!(error = %err, "cleanup: erase failed");
        }

        match module.is_loaded().await {
            Ok(true) => {
                if let Err(err) = module.unload().await {
                    warn!(error = %err, "cleanup: unload failed");
                }
            }
            Ok(false) => {}
            Err(err) => warn!(error = %err, "cleanup: module state unknown"),
        }
    }
}

impl RootCommand {
    pub async fn run(self) -> Result<(), CliError> {
        let output = Output::new(self.args.output_format);

        let environment = match Environment::new(self.args, output) {
            Ok(environment) => environment,
            Err(err) => {
                let err = CliError::from(err);
                output.write(&err);
                return Err(err);
            }
        };

        let result = match self.action {
            SubCommands::Start(start) => start.run(&environment).await,
            SubCommands::Stop(stop) => stop.run(&environment).await,
            SubCommands::Debug(debug) => debug.run(&environment).await,
            SubCommands::CheckIni(check) => check.run(&environment),
            SubCommands::RandomIni(random) => random.run(&environment),
            SubCommands::Dump(dump) => dump.run(&environment),
            SubCommands::Erase(erase) => erase.run(&environment),
            SubCommands::Roundtrip(roundtrip) => roundtrip.run(&environment),
            SubCommands::Devices(devices) => devices.run(&environment).await,
            SubCommands::Watch(watch) => watch.run(&environment).await,
            SubCommands::Config(config) => config.run(&environment),
        };

        if let Err(err) = result {
            let err = CliError::from(err);
            environment.output.write(&err);
            return Err(err);
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, ThisError)]
pub enum CliError {
    /// The module is missing or not loaded.
    #[error(transparent)]
    Environment(#[serde(serialize_with = "serialize_eyre_report")] EyreReport),

    /// A round trip read back something other than what was written.
    #[error("{report}")]
    Mismatch {
        #[serde(serialize_with = "serialize_eyre_report")]
        report: EyreReport,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Other(#[serde(serialize_with = "serialize_eyre_report")] EyreReport),
}

impl From<EyreReport> for CliError {
    fn from(report: EyreReport) -> Self {
        let mismatch = report
            .chain()
            .find_map(|err| err.downcast_ref::<ComparisonMismatch>())
            .cloned();

        if let Some(ComparisonMismatch { expected, actual }) = mismatch {
            return Self::Mismatch {
                report,
                expected,
                actual,
            };
        }

        let environment = report.chain().any(|err| {
            err.downcast_ref::<ProtocolError>()
                .is_some_and(ProtocolError::is_environment)
        });

        if environment {
            return Self::Environment(report);
        }

        Self::Other(report)
    }
}

impl From<CliError> for ExitCode {
    fn from(error: CliError) -> Self {
        match error {
            CliError::Environment(_) => Self::from(2),
            CliError::Mismatch { .. } => Self::from(3),
            CliError::Other(_) => Self::FAILURE,
        }
    }
}

impl Report for CliError {
    fn report(&self) {
        match self {
            Self::Environment(report) | Self::Other(report) => {
                eprintln!("{} {report:?}", "[ERROR]".red());
            }
            Self::Mismatch {
                report,
                expected,
                actual,
            } => {
                let mismatch = ComparisonMismatch {
                    expected: expected.clone(),
                    actual: actual.clone(),
                };
                eprintln!("{} {report:#}", "[ERROR]".red());
                eprintln!("{}", mismatch.diff());
            }
        }
    }
}

fn serialize_eyre_report<S>(report: &EyreReport, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(report.chain().map(ToString::to_string))
}
