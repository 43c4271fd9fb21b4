//! Builds a [`Configuration`] from an [`IniDocument`].
//!
//! Sections name devices, either directly (`tty`, `tty0`, `i2c3`) or by the
//! name the host exposes them under (`ttyHWE0`, `hwei2c3`). Every key/value
//! line of a section is one request/response pair.
//!
//! Checks run in a fixed order and the first failure wins: section names,
//! duplicate devices, device numbering, then the pairs of each device in
//! canonical order. Nothing is returned on failure.

#[cfg(test)]
#[path = "tests/validate.rs"]
mod tests;

use std::collections::BTreeMap;
use std::{fmt, fs, io};

use camino::{Utf8Path, Utf8PathBuf};
use hwemu_primitives::device::parse_index;
use hwemu_primitives::hex::{self, HexError};
use hwemu_primitives::{DeviceName, Pair, PairError, Profile, Side};
use thiserror::Error;
use tracing::debug;

use crate::configuration::{BuildError, Configuration, ConfigurationBuilder};
use crate::ini::{Entry, IniDocument, ParseError, Section};

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct ValidationError {
    pub source_name: String,
    pub section: Option<String>,
    pub key: Option<String>,
    pub line: Option<usize>,
    #[source]
    pub kind: ValidationErrorKind,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_name)?;

        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }

        if let Some(section) = &self.section {
            write!(f, ": [{section}]")?;
        }

        if let Some(key) = &self.key {
            write!(f, " {key}")?;
        }

        write!(f, ": {}", self.kind)
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum ValidationErrorKind {
    #[error("section does not name a device of a supported interface")]
    UnknownDevice,

    #[error("device {device} is already declared by section [{first}]")]
    DuplicateDevice { device: DeviceName, first: String },

    #[error("devices are not numbered consecutively, {missing} is missing")]
    NonConsecutive { missing: DeviceName },

    #[error("more than {max} devices")]
    TooManyDevices { max: usize },

    #[error("invalid {side}: {source}")]
    Hex {
        side: Side,
        #[source]
        source: HexError,
    },

    #[error("empty {0}")]
    Empty(Side),

    #[error("{side} is {len} bytes long, at most {max} are allowed")]
    TooLong { side: Side, len: usize, max: usize },

    #[error("request is already answered by pair {existing}")]
    DuplicateRequest { existing: usize },

    #[error("more than {max} pairs")]
    TooManyPairs { max: usize },

    #[error("{count} pairs, at least {min} are required")]
    TooFewPairs { count: usize, min: usize },

    #[error(transparent)]
    Pair(PairError),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Reads, parses and validates a configuration file.
pub fn load_file(profile: Profile, path: &Utf8Path) -> Result<Configuration, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_owned(),
        source,
    })?;

    load_str(profile, path.as_str(), &text)
}

pub fn load_str(
    profile: Profile,
    source_name: &str,
    text: &str,
) -> Result<Configuration, LoadError> {
    let document = IniDocument::parse(source_name, text)?;

    Ok(Validator::new(profile).validate(&document)?)
}

#[derive(Clone, Copy, Debug)]
pub struct Validator {
    profile: Profile,
}

struct Declared<'a> {
    section: &'a Section,
    extern_name: Option<String>,
}

impl Validator {
    #[must_use]
    pub const fn new(profile: Profile) -> Self {
        Self { profile }
    }

    /// Maps a section name to the device it declares, along with the
    /// external name when the section used one.
    #[must_use]
    pub fn resolve(&self, section: &str) -> Option<(DeviceName, Option<String>)> {
        if let Some(iface) = self.profile.interface(section) {
            return Some((DeviceName::new(iface, 0), None));
        }

        for iface in self.profile.interfaces {
            if let Some(index) = section.strip_prefix(iface.tag()).and_then(parse_index) {
                return Some((DeviceName::new(*iface, index), None));
            }
        }

        for iface in self.profile.interfaces {
            if let Some(index) = section
                .strip_prefix(iface.extern_prefix())
                .and_then(parse_index)
            {
                return Some((DeviceName::new(*iface, index), Some(section.to_owned())));
            }
        }

        None
    }

    pub fn validate(&self, document: &IniDocument) -> Result<Configuration, ValidationError> {
        let fail = |section: &Section, entry: Option<&Entry>, kind| ValidationError {
            source_name: document.source_name().to_owned(),
            section: Some(section.name.clone()),
            key: entry.map(|entry| entry.key.clone()),
            line: Some(entry.map_or(section.line, |entry| entry.line)),
            kind,
        };

        let mut resolved = Vec::with_capacity(document.sections().len());

        for section in document.sections() {
            let (name, extern_name) = self
                .resolve(&section.name)
                .ok_or_else(|| fail(section, None, ValidationErrorKind::UnknownDevice))?;

            resolved.push((name, Declared { section, extern_name }));
        }

        let mut declared: BTreeMap<DeviceName, Declared<'_>> = BTreeMap::new();

        for (name, entry) in resolved {
            if let Some(first) = declared.get(&name) {
                return Err(fail(
                    entry.section,
                    None,
                    ValidationErrorKind::DuplicateDevice {
                        device: name,
                        first: first.section.name.clone(),
                    },
                ));
            }

            let _ignored = declared.insert(name, entry);
        }

        let limits = self.profile.limits;
        let mut builder = ConfigurationBuilder::new(self.profile);
        let mut ordered = Vec::with_capacity(declared.len());

        for iface in self.profile.interfaces {
            let mut next = 0;
            let mut count = 0;

            while let Some(entry) = declared.get(&DeviceName::new(*iface, next)) {
                if count >= limits.max_devices {
                    return Err(fail(
                        entry.section,
                        None,
                        ValidationErrorKind::TooManyDevices {
                            max: limits.max_devices,
                        },
                    ));
                }

                let name = DeviceName::new(*iface, next);
                builder
                    .add_device(name, entry.extern_name.clone())
                    .map_err(|err| fail(entry.section, None, build_error_kind(err)))?;
                ordered.push((name, entry.section));
                next += 1;
                count += 1;
            }

            let missing = DeviceName::new(*iface, next);

            if let Some((_, leftover)) = declared
                .range(missing..=DeviceName::new(*iface, u32::MAX))
                .next()
            {
                return Err(fail(
                    leftover.section,
                    None,
                    ValidationErrorKind::NonConsecutive { missing },
                ));
            }
        }

        for (name, section) in ordered {
            let mut count = 0;

            for entry in &section.entries {
                let pair = self
                    .pair(entry)
                    .map_err(|kind| fail(section, Some(entry), kind))?;

                if count >= limits.max_pairs {
                    return Err(fail(
                        section,
                        Some(entry),
                        ValidationErrorKind::TooManyPairs {
                            max: limits.max_pairs,
                        },
                    ));
                }

                let _index = builder
                    .push_pair(name, pair)
                    .map_err(|err| fail(section, Some(entry), build_error_kind(err)))?;
                count += 1;
            }

            if count < limits.min_pairs {
                return Err(fail(
                    section,
                    None,
                    ValidationErrorKind::TooFewPairs {
                        count,
                        min: limits.min_pairs,
                    },
                ));
            }

            debug!(device = %name, pairs = count, "validated device");
        }

        Ok(builder.build())
    }

    fn pair(&self, entry: &Entry) -> Result<Pair, ValidationErrorKind> {
        let limits = self.profile.limits;

        let request = decode_side(Side::Request, &entry.key, limits.max_request)?;
        let response = decode_side(Side::Response, &entry.value, limits.max_response)?;

        Pair::new(request, response).map_err(|err| match err {
            PairError::Empty(side) => ValidationErrorKind::Empty(side),
            other => ValidationErrorKind::Pair(other),
        })
    }
}

fn decode_side(side: Side, text: &str, max: usize) -> Result<Vec<u8>, ValidationErrorKind> {
    let bytes =
        hex::decode_value(text).map_err(|source| ValidationErrorKind::Hex { side, source })?;

    if bytes.is_empty() {
        return Err(ValidationErrorKind::Empty(side));
    }

    if bytes.len() > max {
        return Err(ValidationErrorKind::TooLong {
            side,
            len: bytes.len(),
            max,
        });
    }

    Ok(bytes)
}

fn build_error_kind(err: BuildError) -> ValidationErrorKind {
    match err {
        BuildError::DuplicateRequest { existing, .. } => {
            ValidationErrorKind::DuplicateRequest { existing }
        }
        BuildError::DuplicateDevice(device) => ValidationErrorKind::DuplicateDevice {
            device,
            first: device.to_string(),
        },
        BuildError::UnsupportedInterface(..) | BuildError::UnknownDevice(_) => {
            ValidationErrorKind::UnknownDevice
        }
    }
}
