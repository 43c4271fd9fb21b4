//! Kernel module revisions.
//!
//! Two revisions of the emulator module are in use. They differ in module
//! name, supported interfaces, size limits and in how pairs are read back,
//! so the revision is always chosen explicitly by the caller.

#[cfg(test)]
#[path = "tests/profile.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::iface::Interface;

/// Upper bound of a single sysfs attribute read.
pub const PAGE_SIZE: usize = 4096;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Longest request, in bytes.
    pub max_request: usize,
    /// Longest response, in bytes.
    pub max_response: usize,
    pub min_pairs: usize,
    pub max_pairs: usize,
    /// Devices per interface.
    pub max_devices: usize,
}

impl Limits {
    /// Limits for a module that lists every pair of a device in a single
    /// page-sized file: `max_pairs` is as large as the page allows.
    #[must_use]
    pub const fn page_budget(
        page_size: usize,
        max_request: usize,
        max_response: usize,
        max_devices: usize,
    ) -> Self {
        Self {
            max_request,
            max_response,
            min_pairs: 0,
            max_pairs: page_budget_max_pairs(page_size, max_request, max_response),
            max_devices,
        }
    }
}

/// How a device's pairs are laid out for reading.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairLayout {
    /// `<dev>/pairs/<index>`, one file per pair holding `<req>=<resp>`.
    FilePerPair,
    /// `<dev>/pairs`, a single file of `<index>\t<req>=<resp>` lines.
    LinePerPair,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    #[default]
    Hwemu,
    Vcpsim,
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown module revision: {0} (expected `hwemu` or `vcpsim`)")]
pub struct UnknownRevision(pub String);

impl Revision {
    pub const ALL: [Self; 2] = [Self::Hwemu, Self::Vcpsim];

    #[must_use]
    pub const fn profile(self) -> Profile {
        match self {
            Self::Hwemu => Profile::HWEMU,
            Self::Vcpsim => Profile::VCPSIM,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hwemu => "hwemu",
            Self::Vcpsim => "vcpsim",
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Revision {
    type Err = UnknownRevision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rev| rev.as_str() == s)
            .ok_or_else(|| UnknownRevision(s.to_owned()))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Profile {
    pub revision: Revision,
    /// Kernel module name, also the name of its sysfs base directory.
    pub module: &'static str,
    /// Supported interfaces, in canonical order.
    pub interfaces: &'static [Interface],
    pub limits: Limits,
    pub layout: PairLayout,
}

impl Profile {
    pub const HWEMU: Self = Self {
        revision: Revision::Hwemu,
        module: "hwemu",
        interfaces: &[Interface::Tty, Interface::I2c, Interface::Net, Interface::Spi],
        limits: Limits {
            max_request: (PAGE_SIZE - 1) / 4,
            max_response: (PAGE_SIZE - 1) / 4,
            min_pairs: 0,
            max_pairs: 1000,
            // spidev caps the number of minors at 256
            max_devices: 256,
        },
        layout: PairLayout::FilePerPair,
    };

    pub const VCPSIM: Self = Self {
        revision: Revision::Vcpsim,
        module: "vcpsim",
        interfaces: &[Interface::Tty, Interface::I2c],
        limits: Limits::page_budget(PAGE_SIZE, 64, 64, 8),
        layout: PairLayout::LinePerPair,
    };

    #[must_use]
    pub fn supports(&self, iface: Interface) -> bool {
        self.interfaces.contains(&iface)
    }

    /// Resolves a tag to an interface of this profile.
    #[must_use]
    pub fn interface(&self, tag: &str) -> Option<Interface> {
        Interface::from_tag(tag).filter(|iface| self.supports(*iface))
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::HWEMU
    }
}

/// Number of `<index>\t<req>=<resp>\n` lines of maximal length that fit in
/// `page_size` bytes, counting lines while the total stays below the page.
#[must_use]
pub const fn page_budget_max_pairs(page_size: usize, max_request: usize, max_response: usize) -> usize {
    let mut pairs = 0;
    let mut used = 0;

    loop {
        let line = decimal_digits(pairs) + 1 + max_request * 2 + 1 + max_response * 2 + 1;

        if used + line >= page_size {
            break pairs;
        }

        used += line;
        pairs += 1;
    }
}

const fn decimal_digits(mut n: usize) -> usize {
    let mut digits = 1;

    while n >= 10 {
        n /= 10;
        digits += 1;
    }

    digits
}
