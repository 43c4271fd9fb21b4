use clap::Parser;
use const_format::concatcp;
use eyre::{Report as EyreReport, Result as EyreResult, WrapErr};
use hwemu_model::{compare, pretty, ConfigGenerator};
use hwemu_primitives::Revision;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::Environment;
use crate::output::{InfoLine, Report};

pub const EXAMPLES: &str = r"
  $ sudo hwectl roundtrip
  $ sudo hwectl --profile vcpsim roundtrip --repeats 200 --seed 7
";

/// Differential test against the loaded module.
///
/// Each repeat generates a configuration from the next seed, writes it,
/// reads it back, erases it and compares the canonical forms. The first
/// failure stops the run; a failed write is erased before returning.
#[derive(Clone, Copy, Debug, Parser)]
#[command(after_help = concatcp!("Examples:", EXAMPLES))]
pub struct RoundtripCommand {
    /// Number of configurations to try
    #[arg(long, value_name = "N")]
    pub repeats: Option<usize>,

    /// Seed of the first configuration
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct Passed {
    revision: Revision,
    repeats: usize,
    first_seed: u64,
    pairs: usize,
}

impl Report for Passed {
    fn report(&self) {
        InfoLine(&format!(
            "{} round trip(s) passed on {} ({} pairs, seeds {}..)",
            self.repeats, self.revision, self.pairs, self.first_seed
        ))
        .report();
    }
}

impl RoundtripCommand {
    pub fn run(self, environment: &Environment) -> EyreResult<()> {
        let settings = &environment.config.roundtrip;
        let repeats = self.repeats.unwrap_or(settings.repeats);
        let first_seed = self.seed.or(settings.seed).unwrap_or_else(rand::random);
        let limits = environment.config.generator.limits;

        let tree = environment.tree();
        let mut pairs = 0;
        let mut seed = first_seed;

        for iteration in 0..repeats {
            let mut generator = ConfigGenerator::from_seed(environment.profile, seed);

            if let Some(limits) = limits {
                generator = generator.with_limits(limits)?;
            }

            let written = generator.generate();

            debug!(seed, summary = %pretty(&written), "generated");

            if let Err(err) = tree.write(&written) {
                // a refused precondition wrote nothing, and the devices
                // already there are not ours to remove
                if !err.is_precondition() {
                    if let Err(cleanup) = tree.erase() {
                        warn!(error = %cleanup, "cleanup: erase failed");
                    }
                }
                return Err(err).wrap_err_with(|| format!("write failed for seed {seed}"));
            }

            let read = tree
                .read()
                .wrap_err_with(|| format!("read failed for seed {seed}"));
            let erased = tree
                .erase()
                .wrap_err_with(|| format!("erase failed for seed {seed}"));

            let read = read?;
            erased?;

            if let Err(mismatch) = compare(&written, &read) {
                return Err(EyreReport::new(mismatch))
                    .wrap_err_with(|| format!("round trip {iteration} (seed {seed}) differs"));
            }

            pairs += written.pair_count();

            info!(
                iteration,
                seed,
                devices = written.device_count(),
                pairs = written.pair_count(),
                "round trip passed"
            );

            seed = seed.wrapping_add(1);
        }

        environment.output.write(&Passed {
            revision: environment.profile.revision,
            repeats,
            first_seed,
            pairs,
        });

        Ok(())
    }
}
