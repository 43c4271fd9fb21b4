//! Synchronization protocol between a [`Configuration`] and the kernel
//! module's sysfs tree.
//!
//! ```text
//! <base>/<iface>/add                   write "1": allocate the next device
//! <base>/<iface>/uninstall             write "<iface><n>": remove a device
//! <base>/<iface>/<iface><n>/add        write "<req>=<resp>": append a pair
//! <base>/<iface>/<iface><n>/pairs/<i>  read: one pair      (file-per-pair)
//! <base>/<iface>/<iface><n>/pairs      read: "<i>\t<pair>" (line-per-pair)
//! ```
//!
//! The module allocates device indexes itself, lowest free first, so devices
//! must be added in ascending order onto an empty interface. Which read-back
//! layout applies is decided by the [`Profile`], never guessed from the tree.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::ControlFlow;

use camino::{Utf8Path, Utf8PathBuf};
use hwemu_model::{Configuration, ConfigurationBuilder, Device, Visitor};
use hwemu_primitives::device::parse_index;
use hwemu_primitives::{DeviceName, Interface, Pair, PairLayout, Profile};
use tracing::{debug, info, warn};

pub mod error;
pub mod fs;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(test)]
#[path = "tests/protocol.rs"]
mod tests;

pub use error::ProtocolError;
pub use fs::{ControlFs, HostFs};

const ADD: &str = "add";
const UNINSTALL: &str = "uninstall";
const PAIRS: &str = "pairs";

/// Handle on one module instance's sysfs tree.
#[derive(Clone, Debug)]
pub struct SysfsTree<F = HostFs> {
    base: Utf8PathBuf,
    profile: Profile,
    fs: F,
}

impl SysfsTree<HostFs> {
    /// The module's tree at its standard location, `/sys/kernel/<module>`.
    #[must_use]
    pub fn host(profile: Profile) -> Self {
        Self::new(default_base(&profile), profile, HostFs)
    }
}

#[must_use]
pub fn default_base(profile: &Profile) -> Utf8PathBuf {
    Utf8Path::new("/sys/kernel").join(profile.module)
}

impl<F: ControlFs> SysfsTree<F> {
    pub fn new(base: impl Into<Utf8PathBuf>, profile: Profile, fs: F) -> Self {
        Self {
            base: base.into(),
            profile,
            fs,
        }
    }

    #[must_use]
    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    #[must_use]
    pub const fn fs(&self) -> &F {
        &self.fs
    }

    fn iface_dir(&self, iface: Interface) -> Utf8PathBuf {
        self.base.join(iface.tag())
    }

    fn device_dir(&self, name: DeviceName) -> Utf8PathBuf {
        self.iface_dir(name.iface()).join(name.to_string())
    }

    /// Pushes `config` into the module.
    ///
    /// Every interface the configuration has devices on must be empty. The
    /// first failed write aborts; whatever was written stays in place for
    /// the caller to [`erase`](Self::erase).
    pub fn write(&self, config: &Configuration) -> Result<(), ProtocolError> {
        if config.profile().revision != self.profile.revision {
            return Err(ProtocolError::RevisionMismatch {
                expected: self.profile.revision,
                found: config.profile().revision,
            });
        }

        for (iface, devices) in config.interfaces() {
            if devices.is_empty() {
                continue;
            }

            let count = self.device_names(iface)?.len();

            if count > 0 {
                return Err(ProtocolError::Occupied { iface, count });
            }
        }

        let mut writer = Writer { tree: self };

        if let ControlFlow::Break(err) = config.traverse(&mut writer) {
            return Err(err);
        }

        info!(
            base = %self.base,
            devices = config.device_count(),
            pairs = config.pair_count(),
            "configuration written"
        );

        Ok(())
    }

    /// Rebuilds a configuration from what the module currently holds.
    pub fn read(&self) -> Result<Configuration, ProtocolError> {
        let mut builder = ConfigurationBuilder::new(self.profile);

        for iface in self.profile.interfaces {
            for name in self.device_names(*iface)? {
                let dir = self.device_dir(name);

                builder
                    .add_device(name, None)
                    .map_err(|err| malformed(&dir, err))?;

                let pairs = match self.profile.layout {
                    PairLayout::FilePerPair => self.read_pair_files(&dir)?,
                    PairLayout::LinePerPair => self.read_pair_lines(&dir)?,
                };

                debug!(device = %name, pairs = pairs.len(), "read device");

                for pair in pairs {
                    let _index = builder
                        .push_pair(name, pair)
                        .map_err(|err| malformed(&dir, err))?;
                }
            }
        }

        Ok(builder.build())
    }

    /// Removes every device of every interface.
    ///
    /// Keeps going after a failure; every failure is logged and the first
    /// one is returned.
    pub fn erase(&self) -> Result<(), ProtocolError> {
        let mut first = None;
        let mut removed = 0_usize;

        for iface in self.profile.interfaces {
            let names = match self.device_names(*iface) {
                Ok(names) => names,
                Err(err) => {
                    warn!(%iface, error = %err, "failed to list devices");
                    let _ignored = first.get_or_insert(err);
                    continue;
                }
            };

            let path = self.iface_dir(*iface).join(UNINSTALL);

            for name in names {
                match self.write_control(&path, &name.to_string()) {
                    Ok(()) => {
                        debug!(device = %name, "device uninstalled");
                        removed += 1;
                    }
                    Err(err) => {
                        warn!(device = %name, error = %err, "failed to uninstall device");
                        let _ignored = first.get_or_insert(err);
                    }
                }
            }
        }

        info!(base = %self.base, removed, "devices erased");

        first.map_or(Ok(()), Err)
    }

    /// Number of device directories per interface.
    pub fn device_count(&self) -> Result<BTreeMap<Interface, usize>, ProtocolError> {
        let mut counts = BTreeMap::new();

        for iface in self.profile.interfaces {
            let _ignored = counts.insert(*iface, self.device_names(*iface)?.len());
        }

        Ok(counts)
    }

    /// Devices present under an interface, in ascending numeric order.
    /// Entries that are not device directories are skipped.
    pub fn device_names(&self, iface: Interface) -> Result<Vec<DeviceName>, ProtocolError> {
        let dir = self.iface_dir(iface);

        let entries = self
            .fs
            .list_dir(&dir)
            .map_err(|err| ProtocolError::from_read(dir.clone(), self.profile.module, err))?;

        let mut names: Vec<_> = entries
            .iter()
            .filter_map(|entry| DeviceName::parse_in(iface, entry).ok())
            .filter(|name| self.fs.is_dir(&dir.join(name.to_string())))
            .collect();

        names.sort_unstable();

        Ok(names)
    }

    fn read_pair_files(&self, dir: &Utf8Path) -> Result<Vec<Pair>, ProtocolError> {
        let pairs_dir = dir.join(PAIRS);

        let entries = self
            .fs
            .list_dir(&pairs_dir)
            .map_err(|err| ProtocolError::from_read(pairs_dir.clone(), self.profile.module, err))?;

        let mut indexes = entries
            .iter()
            .map(|entry| {
                parse_index(entry).ok_or_else(|| ProtocolError::Malformed {
                    path: pairs_dir.join(entry),
                    reason: "pair file name is not an index".to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        indexes.sort_unstable();

        let mut pairs = Vec::with_capacity(indexes.len());

        for (expected, index) in (0..).zip(indexes) {
            let path = pairs_dir.join(index.to_string());

            if index != expected {
                return Err(ProtocolError::Malformed {
                    path,
                    reason: format!("expected pair file {expected}"),
                });
            }

            let text = self.read_control(&path)?;
            pairs.push(text.parse::<Pair>().map_err(|err| malformed(&path, err))?);
        }

        Ok(pairs)
    }

    fn read_pair_lines(&self, dir: &Utf8Path) -> Result<Vec<Pair>, ProtocolError> {
        let path = dir.join(PAIRS);
        let text = self.read_control(&path)?;

        let mut pairs = Vec::new();

        for (expected, line) in (0_usize..).zip(text.lines()) {
            let (index, pair) = line.split_once('\t').ok_or_else(|| ProtocolError::Malformed {
                path: path.clone(),
                reason: format!("line {expected} has no index"),
            })?;

            if index.parse::<usize>().ok() != Some(expected) {
                return Err(ProtocolError::Malformed {
                    path,
                    reason: format!("expected line {expected}, found {index:?}"),
                });
            }

            pairs.push(pair.parse::<Pair>().map_err(|err| malformed(&path, err))?);
        }

        Ok(pairs)
    }

    fn read_control(&self, path: &Utf8Path) -> Result<String, ProtocolError> {
        self.fs
            .read(path)
            .map_err(|err| ProtocolError::from_read(path.to_owned(), self.profile.module, err))
    }

    fn write_control(&self, path: &Utf8Path, content: &str) -> Result<(), ProtocolError> {
        self.fs.write(path, content).map_err(|err| {
            ProtocolError::from_write(path.to_owned(), self.profile.module, content, err)
        })
    }
}

fn malformed(path: &Utf8Path, reason: impl fmt::Display) -> ProtocolError {
    ProtocolError::Malformed {
        path: path.to_owned(),
        reason: reason.to_string(),
    }
}

struct Writer<'a, F> {
    tree: &'a SysfsTree<F>,
}

impl<F: ControlFs> Visitor for Writer<'_, F> {
    type Break = ProtocolError;

    fn visit_device(&mut self, device: &Device) -> ControlFlow<Self::Break> {
        let name = device.name();
        let add = self.tree.iface_dir(name.iface()).join(ADD);

        if let Err(err) = self.tree.write_control(&add, "1") {
            return ControlFlow::Break(err);
        }

        let dir = self.tree.device_dir(name);

        if !self.tree.fs.is_dir(&dir) {
            return ControlFlow::Break(ProtocolError::Desync {
                expected: name,
                path: dir,
            });
        }

        debug!(device = %name, "device allocated");

        ControlFlow::Continue(())
    }

    fn visit_pair(&mut self, device: &Device, index: usize, pair: &Pair) -> ControlFlow<Self::Break> {
        let add = self.tree.device_dir(device.name()).join(ADD);

        match self.tree.write_control(&add, &pair.to_string()) {
            Ok(()) => {
                debug!(device = %device.name(), index, "pair written");
                ControlFlow::Continue(())
            }
            Err(err) => ControlFlow::Break(err),
        }
    }
}
