#[cfg(test)]
#[path = "tests/device.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::iface::Interface;

/// `<interface-tag><index>`, e.g. `tty0` or `i2c12`.
///
/// Ordering is by interface, then by numeric index, so `tty9` sorts before
/// `tty10`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DeviceName {
    iface: Interface,
    index: u32,
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DeviceNameError {
    #[error("{0:?} does not start with a known interface tag")]
    UnknownInterface(String),

    #[error("{0:?} has no device number")]
    MissingIndex(String),

    #[error("{0:?} has an invalid device number")]
    InvalidIndex(String),
}

impl DeviceName {
    #[must_use]
    pub const fn new(iface: Interface, index: u32) -> Self {
        Self { iface, index }
    }

    #[must_use]
    pub const fn iface(&self) -> Interface {
        self.iface
    }

    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Parses a name that must belong to `iface`.
    pub fn parse_in(iface: Interface, name: &str) -> Result<Self, DeviceNameError> {
        let digits = name
            .strip_prefix(iface.tag())
            .ok_or_else(|| DeviceNameError::UnknownInterface(name.to_owned()))?;

        if digits.is_empty() {
            return Err(DeviceNameError::MissingIndex(name.to_owned()));
        }

        let index =
            parse_index(digits).ok_or_else(|| DeviceNameError::InvalidIndex(name.to_owned()))?;

        Ok(Self::new(iface, index))
    }

    /// The name under which the host exposes this device.
    #[must_use]
    pub fn extern_name(&self) -> String {
        format!("{}{}", self.iface.extern_prefix(), self.index)
    }
}

/// Parses a canonical decimal device number: digits only, no sign, no
/// leading zeros.
#[must_use]
pub fn parse_index(digits: &str) -> Option<u32> {
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits.len() == 1 || !digits.starts_with('0'));

    canonical.then(|| digits.parse().ok()).flatten()
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.iface.tag(), self.index)
    }
}

impl FromStr for DeviceName {
    type Err = DeviceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let iface = Interface::ALL
            .into_iter()
            .find(|iface| s.starts_with(iface.tag()))
            .ok_or_else(|| DeviceNameError::UnknownInterface(s.to_owned()))?;

        Self::parse_in(iface, s)
    }
}

impl Serialize for DeviceName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
