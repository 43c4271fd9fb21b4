#[cfg(test)]
#[path = "tests/iface.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Emulated interface category.
///
/// The declaration order is the canonical order: every traversal and every
/// serialization lists interfaces in this order, never in insertion order.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    Tty,
    I2c,
    Net,
    Spi,
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown interface: {0}")]
pub struct UnknownInterface(pub String);

impl Interface {
    pub const ALL: [Self; 4] = [Self::Tty, Self::I2c, Self::Net, Self::Spi];

    /// Short lowercase tag, also the name of the interface's sysfs directory.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Tty => "tty",
            Self::I2c => "i2c",
            Self::Net => "net",
            Self::Spi => "spi",
        }
    }

    /// Prefix of the name under which the host exposes a device of this
    /// interface, e.g. `ttyHWE0` for `tty0`.
    #[must_use]
    pub const fn extern_prefix(self) -> &'static str {
        match self {
            Self::Tty => "ttyHWE",
            Self::I2c => "hwei2c",
            Self::Net => "hwenet",
            Self::Spi => "hwespi",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|iface| iface.tag() == tag)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

impl FromStr for Interface {
    type Err = UnknownInterface;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| UnknownInterface(s.to_owned()))
    }
}
