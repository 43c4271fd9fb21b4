//! Random configurations for differential testing.
//!
//! Every generated configuration satisfies the validator by construction.
//! Requests are unique across the whole configuration, not just per
//! device, which maximises the number of distinct keys a write/read round
//! trip has to carry. The pool of used requests belongs to one
//! [`ConfigGenerator::generate`] call.

#[cfg(test)]
#[path = "tests/random.rs"]
mod tests;

use std::collections::HashSet;

use hwemu_primitives::{DeviceName, Limits, Pair, Profile};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use crate::configuration::{Configuration, ConfigurationBuilder, Device};

/// Generation limits used when the caller does not pick any: the profile's
/// own limits, capped so a configuration stays small enough to push
/// through sysfs quickly.
pub const DEFAULT_CAP: Limits = Limits {
    max_request: 16,
    max_response: 16,
    min_pairs: 0,
    max_pairs: 16,
    max_devices: 4,
};

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum GeneratorError {
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },

    #[error("{field} = {value} exceeds the {module} limit of {max}")]
    ExceedsProfile {
        field: &'static str,
        value: usize,
        max: usize,
        module: &'static str,
    },

    #[error("{field} = {value} is below the {module} minimum of {min}")]
    BelowProfile {
        field: &'static str,
        value: usize,
        min: usize,
        module: &'static str,
    },

    #[error("min_pairs ({min}) is larger than max_pairs ({max})")]
    InvertedPairRange { min: usize, max: usize },

    #[error("up to {needed} unique requests needed, but requests of at most {max_request} bytes only allow {available}")]
    RequestSpace {
        needed: u64,
        available: u64,
        max_request: usize,
    },
}

#[derive(Debug)]
pub struct ConfigGenerator<R> {
    profile: Profile,
    limits: Limits,
    extern_names: bool,
    rng: R,
}

impl ConfigGenerator<StdRng> {
    #[must_use]
    pub fn from_seed(profile: Profile, seed: u64) -> Self {
        Self::new(profile, StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn from_entropy(profile: Profile) -> Self {
        Self::new(profile, StdRng::from_entropy())
    }
}

impl<R: Rng> ConfigGenerator<R> {
    #[must_use]
    pub fn new(profile: Profile, rng: R) -> Self {
        Self {
            profile,
            limits: default_limits(&profile),
            extern_names: false,
            rng,
        }
    }

    /// Replaces the generation limits. They must lie within the profile's
    /// limits and leave enough distinct requests for the largest possible
    /// configuration.
    pub fn with_limits(mut self, limits: Limits) -> Result<Self, GeneratorError> {
        check_limits(&self.profile, &limits)?;
        self.limits = limits;
        Ok(self)
    }

    /// Records each device's external name, as if the source used
    /// `[ttyHWE0]`-style sections.
    #[must_use]
    pub const fn with_extern_names(mut self, enabled: bool) -> Self {
        self.extern_names = enabled;
        self
    }

    #[must_use]
    pub const fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn generate(&mut self) -> Configuration {
        let limits = self.limits;
        let mut used = HashSet::new();
        let mut builder = ConfigurationBuilder::new(self.profile);

        for iface in self.profile.interfaces {
            let devices = self.rng.gen_range(1..=limits.max_devices);

            for index in (0..).take(devices) {
                let name = DeviceName::new(*iface, index);
                let count = self.rng.gen_range(limits.min_pairs..=limits.max_pairs);
                let mut pairs = Vec::with_capacity(count);

                while pairs.len() < count {
                    let request = self.bytes(limits.max_request);

                    if !used.insert(request.clone()) {
                        continue;
                    }

                    let response = self.bytes(limits.max_response);

                    if let Ok(pair) = Pair::new(request, response) {
                        pairs.push(pair);
                    }
                }

                let extern_name = self.extern_names.then(|| name.extern_name());
                builder.insert_unchecked(Device::from_parts(name, extern_name, pairs));
            }
        }

        let config = builder.build();

        debug!(
            devices = config.device_count(),
            pairs = config.pair_count(),
            "generated random configuration"
        );

        config
    }

    fn bytes(&mut self, max_len: usize) -> Vec<u8> {
        let mut bytes = vec![0; self.rng.gen_range(1..=max_len)];
        self.rng.fill(&mut bytes[..]);
        bytes
    }
}

/// One configuration from a seeded generator with default limits.
#[must_use]
pub fn random_config(profile: Profile, seed: u64) -> Configuration {
    ConfigGenerator::from_seed(profile, seed).generate()
}

#[must_use]
pub fn default_limits(profile: &Profile) -> Limits {
    let limits = profile.limits;

    Limits {
        max_request: limits.max_request.min(DEFAULT_CAP.max_request),
        max_response: limits.max_response.min(DEFAULT_CAP.max_response),
        min_pairs: limits.min_pairs,
        max_pairs: limits.max_pairs.min(DEFAULT_CAP.max_pairs).max(limits.min_pairs),
        max_devices: limits.max_devices.min(DEFAULT_CAP.max_devices),
    }
}

fn check_limits(profile: &Profile, limits: &Limits) -> Result<(), GeneratorError> {
    // (field, requested, profile limit, may be zero)
    let fields = [
        ("max_request", limits.max_request, profile.limits.max_request, false),
        ("max_response", limits.max_response, profile.limits.max_response, false),
        ("max_pairs", limits.max_pairs, profile.limits.max_pairs, true),
        ("max_devices", limits.max_devices, profile.limits.max_devices, false),
    ];

    for (field, value, max, zero_ok) in fields {
        if value == 0 && !zero_ok {
            return Err(GeneratorError::Zero { field });
        }

        if value > max {
            return Err(GeneratorError::ExceedsProfile {
                field,
                value,
                max,
                module: profile.module,
            });
        }
    }

    if limits.min_pairs > limits.max_pairs {
        return Err(GeneratorError::InvertedPairRange {
            min: limits.min_pairs,
            max: limits.max_pairs,
        });
    }

    if limits.min_pairs < profile.limits.min_pairs {
        return Err(GeneratorError::BelowProfile {
            field: "min_pairs",
            value: limits.min_pairs,
            min: profile.limits.min_pairs,
            module: profile.module,
        });
    }

    let needed = [limits.max_devices, limits.max_pairs, profile.interfaces.len()]
        .into_iter()
        .map(|n| u64::try_from(n).unwrap_or(u64::MAX))
        .fold(1_u64, u64::saturating_mul);
    let available = request_space(limits.max_request);

    // at most half of all possible requests may be in use
    if needed > available / 2 {
        return Err(GeneratorError::RequestSpace {
            needed,
            available,
            max_request: limits.max_request,
        });
    }

    Ok(())
}

/// Number of distinct byte strings of length 1..=`max_len`, saturating.
fn request_space(max_len: usize) -> u64 {
    let mut total = 0_u64;
    let mut of_len = 1_u64;

    for _ in 0..max_len {
        of_len = of_len.saturating_mul(256);
        total = total.saturating_add(of_len);

        if total == u64::MAX {
            break;
        }
    }

    total
}
