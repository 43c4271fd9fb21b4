//! In-process stand-in for the kernel module.
//!
//! [`EmulatedModule`] implements [`ControlFs`] over an in-memory device
//! table and answers the same control files the module exposes, with the
//! module's rules: devices take the lowest free index, pairs are rejected
//! when malformed, too long, duplicated or too many, and a missing path is
//! `NotFound`.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use hwemu_primitives::{DeviceName, Interface, Pair, PairLayout, Profile};

use crate::fs::ControlFs;
use crate::{default_base, SysfsTree};

#[derive(Debug)]
pub struct EmulatedModule {
    base: Utf8PathBuf,
    profile: Profile,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    loaded: bool,
    devices: BTreeMap<Interface, BTreeMap<u32, Vec<Pair>>>,
}

#[derive(Clone, Copy, Debug)]
enum Node {
    Base,
    Iface(Interface),
    IfaceAdd(Interface),
    Uninstall(Interface),
    Device,
    DeviceAdd(DeviceName),
    Count(DeviceName),
    Pairs(DeviceName),
    PairFile(DeviceName, usize),
}

impl EmulatedModule {
    /// A loaded module with no devices, at the profile's standard base.
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self::with_base(default_base(&profile), profile)
    }

    #[must_use]
    pub fn with_base(base: impl Into<Utf8PathBuf>, profile: Profile) -> Self {
        let devices = profile
            .interfaces
            .iter()
            .map(|iface| (*iface, BTreeMap::new()))
            .collect();

        Self {
            base: base.into(),
            profile,
            state: Mutex::new(State {
                loaded: true,
                devices,
            }),
        }
    }

    /// A protocol handle driving this module.
    #[must_use]
    pub fn tree(&self) -> SysfsTree<&Self> {
        SysfsTree::new(self.base.clone(), self.profile, self)
    }

    /// Makes every path disappear, as after `rmmod`. Devices are dropped.
    pub fn unload(&self) -> io::Result<()> {
        let mut state = self.lock()?;
        state.loaded = false;
        state.devices.values_mut().for_each(BTreeMap::clear);
        Ok(())
    }

    pub fn load(&self) -> io::Result<()> {
        self.lock()?.loaded = true;
        Ok(())
    }

    /// Total number of devices across interfaces.
    pub fn device_total(&self) -> io::Result<usize> {
        Ok(self.lock()?.devices.values().map(BTreeMap::len).sum())
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| io::Error::other("emulated module state poisoned"))
    }

    fn resolve(&self, state: &State, path: &Utf8Path) -> io::Result<Node> {
        let not_found = || io::Error::new(io::ErrorKind::NotFound, path.to_string());

        if !state.loaded {
            return Err(not_found());
        }

        let relative = path.strip_prefix(&self.base).map_err(|_| not_found())?;
        let parts: Vec<&str> = relative.iter().collect();

        let Some((tag, rest)) = parts.split_first() else {
            return Ok(Node::Base);
        };

        let iface = self.profile.interface(tag).ok_or_else(not_found)?;

        let Some((entry, rest)) = rest.split_first() else {
            return Ok(Node::Iface(iface));
        };

        let device = match (*entry, rest.is_empty()) {
            ("add", true) => return Ok(Node::IfaceAdd(iface)),
            ("uninstall", true) => return Ok(Node::Uninstall(iface)),
            (name, _) => DeviceName::parse_in(iface, name).map_err(|_| not_found())?,
        };

        let pairs = state
            .devices
            .get(&iface)
            .and_then(|devices| devices.get(&device.index()))
            .ok_or_else(not_found)?;

        match (rest, self.profile.layout) {
            ([], _) => Ok(Node::Device),
            (["add"], _) => Ok(Node::DeviceAdd(device)),
            (["count"], _) => Ok(Node::Count(device)),
            (["pairs"], _) => Ok(Node::Pairs(device)),
            (["pairs", index], PairLayout::FilePerPair) => index
                .parse::<usize>()
                .ok()
                .filter(|index| *index < pairs.len())
                .map(|index| Node::PairFile(device, index))
                .ok_or_else(not_found),
            _ => Err(not_found()),
        }
    }

    fn add_device(&self, state: &mut State, iface: Interface) -> io::Result<()> {
        let devices = state.devices.entry(iface).or_default();

        let index = (0..)
            .find(|index| !devices.contains_key(index))
            .filter(|index| usize::try_from(*index).is_ok_and(|i| i < self.profile.limits.max_devices))
            .ok_or_else(|| io::Error::other(format!("{iface}: too many devices")))?;

        let _ignored = devices.insert(index, Vec::new());
        Ok(())
    }

    fn add_pair(&self, state: &mut State, device: DeviceName, content: &str) -> io::Result<()> {
        let invalid = |reason: String| io::Error::new(io::ErrorKind::InvalidInput, reason);
        let limits = self.profile.limits;

        let pair: Pair = content
            .trim()
            .parse()
            .map_err(|err| invalid(format!("{device}: {err}")))?;

        if pair.request().len() > limits.max_request || pair.response().len() > limits.max_response
        {
            return Err(invalid(format!("{device}: pair too long")));
        }

        let pairs = state
            .devices
            .get_mut(&device.iface())
            .and_then(|devices| devices.get_mut(&device.index()))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, device.to_string()))?;

        if pairs.len() >= limits.max_pairs {
            return Err(invalid(format!("{device}: too many pairs")));
        }

        if let Some(existing) = pairs.iter().position(|p| p.request() == pair.request()) {
            return Err(invalid(format!("{device}: duplicate request ({existing})")));
        }

        pairs.push(pair);
        Ok(())
    }

    fn uninstall(state: &mut State, iface: Interface, content: &str) -> io::Result<()> {
        let invalid = || io::Error::new(io::ErrorKind::InvalidInput, content.to_owned());

        let name = DeviceName::parse_in(iface, content.trim()).map_err(|_| invalid())?;

        state
            .devices
            .get_mut(&iface)
            .and_then(|devices| devices.remove(&name.index()))
            .map(drop)
            .ok_or_else(invalid)
    }

    fn pairs_of<'a>(state: &'a State, device: DeviceName) -> &'a [Pair] {
        state
            .devices
            .get(&device.iface())
            .and_then(|devices| devices.get(&device.index()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn is_a_directory(path: &Utf8Path) -> io::Error {
    io::Error::other(format!("{path}: is a directory"))
}

fn not_a_directory(path: &Utf8Path) -> io::Error {
    io::Error::other(format!("{path}: not a directory"))
}

fn write_only(path: &Utf8Path) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, path.to_string())
}

impl ControlFs for EmulatedModule {
    fn write(&self, path: &Utf8Path, content: &str) -> io::Result<()> {
        let mut state = self.lock()?;

        match self.resolve(&state, path)? {
            Node::IfaceAdd(iface) if !content.is_empty() => self.add_device(&mut state, iface),
            Node::DeviceAdd(device) => self.add_pair(&mut state, device, content),
            Node::Uninstall(iface) => Self::uninstall(&mut state, iface, content),
            Node::IfaceAdd(_) => Err(io::Error::new(io::ErrorKind::InvalidInput, "empty write")),
            Node::Base | Node::Iface(_) | Node::Device => Err(is_a_directory(path)),
            Node::Pairs(_) | Node::Count(_) | Node::PairFile(..) => Err(write_only(path)),
        }
    }

    fn read(&self, path: &Utf8Path) -> io::Result<String> {
        let state = self.lock()?;

        match self.resolve(&state, path)? {
            Node::Count(device) => Ok(Self::pairs_of(&state, device).len().to_string()),
            Node::PairFile(device, index) => Self::pairs_of(&state, device)
                .get(index)
                .map(ToString::to_string)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string())),
            Node::Pairs(device) if self.profile.layout == PairLayout::LinePerPair => {
                Ok(Self::pairs_of(&state, device)
                    .iter()
                    .enumerate()
                    .map(|(index, pair)| format!("{index}\t{pair}\n"))
                    .collect())
            }
            Node::IfaceAdd(_) | Node::Uninstall(_) | Node::DeviceAdd(_) => Err(write_only(path)),
            Node::Base | Node::Iface(_) | Node::Device | Node::Pairs(_) => {
                Err(is_a_directory(path))
            }
        }
    }

    fn list_dir(&self, path: &Utf8Path) -> io::Result<Vec<String>> {
        let state = self.lock()?;

        let names = match self.resolve(&state, path)? {
            Node::Base => self
                .profile
                .interfaces
                .iter()
                .map(|iface| iface.tag().to_owned())
                .collect(),
            Node::Iface(iface) => ["add", "uninstall"]
                .into_iter()
                .map(str::to_owned)
                .chain(
                    state
                        .devices
                        .get(&iface)
                        .into_iter()
                        .flat_map(BTreeMap::keys)
                        .map(|index| DeviceName::new(iface, *index).to_string()),
                )
                .collect(),
            Node::Device => ["add", "count", "pairs"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            Node::Pairs(device) if self.profile.layout == PairLayout::FilePerPair => {
                (0..Self::pairs_of(&state, device).len())
                    .map(|index| index.to_string())
                    .collect()
            }
            _ => return Err(not_a_directory(path)),
        };

        Ok(names)
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        let Ok(state) = self.lock() else {
            return false;
        };

        match self.resolve(&state, path) {
            Ok(Node::Base | Node::Iface(_) | Node::Device) => true,
            Ok(Node::Pairs(_)) => self.profile.layout == PairLayout::FilePerPair,
            _ => false,
        }
    }
}
