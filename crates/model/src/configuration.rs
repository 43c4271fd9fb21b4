#[cfg(test)]
#[path = "tests/configuration.rs"]
mod tests;

use std::collections::BTreeMap;

use hwemu_primitives::{DeviceName, Interface, Pair, Profile};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// The root of the tree: every interface of the profile, each with its
/// devices.
///
/// Interfaces the profile supports are always present, even without
/// devices. It has no `PartialEq`; use
/// [`crate::canonical::equal`], which compares canonical forms.
#[derive(Clone, Debug)]
pub struct Configuration {
    profile: Profile,
    interfaces: BTreeMap<Interface, InterfaceDevices>,
}

/// Devices of one interface, keyed and iterated by numeric index.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InterfaceDevices {
    devices: BTreeMap<u32, Device>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Device {
    name: DeviceName,
    /// Name the host exposes the device under; metadata only, never
    /// written to the module and not part of the canonical form.
    #[serde(skip_serializing_if = "Option::is_none")]
    extern_name: Option<String>,
    pairs: Vec<Pair>,
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum BuildError {
    #[error("interface {0} is not supported by the {1} module")]
    UnsupportedInterface(Interface, &'static str),

    #[error("device {0} already exists")]
    DuplicateDevice(DeviceName),

    #[error("device {0} does not exist")]
    UnknownDevice(DeviceName),

    #[error("device {device} already answers this request (pair {existing})")]
    DuplicateRequest { device: DeviceName, existing: usize },
}

impl Configuration {
    /// A configuration with every supported interface and no devices.
    #[must_use]
    pub fn empty(profile: Profile) -> Self {
        ConfigurationBuilder::new(profile).build()
    }

    #[must_use]
    pub fn builder(profile: Profile) -> ConfigurationBuilder {
        ConfigurationBuilder::new(profile)
    }

    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Interfaces in canonical order.
    pub fn interfaces(&self) -> impl Iterator<Item = (Interface, &InterfaceDevices)> {
        self.interfaces.iter().map(|(iface, devices)| (*iface, devices))
    }

    #[must_use]
    pub fn interface(&self, iface: Interface) -> Option<&InterfaceDevices> {
        self.interfaces.get(&iface)
    }

    #[must_use]
    pub fn device(&self, name: DeviceName) -> Option<&Device> {
        self.interface(name.iface())?.get(name.index())
    }

    /// Devices across all interfaces.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.interfaces.values().flat_map(InterfaceDevices::iter)
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.interfaces.values().map(InterfaceDevices::len).sum()
    }

    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.devices().map(Device::len).sum()
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Configuration", 2)?;
        state.serialize_field("module", self.profile.module)?;
        state.serialize_field("interfaces", &self.interfaces)?;
        state.end()
    }
}

impl InterfaceDevices {
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&Device> {
        self.devices.get(&index)
    }

    /// Devices in ascending numeric order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Whether devices are numbered 0..len without gaps.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.devices
            .keys()
            .zip(0..)
            .all(|(index, expected)| *index == expected)
    }
}

impl Serialize for InterfaceDevices {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl Device {
    pub(crate) const fn from_parts(
        name: DeviceName,
        extern_name: Option<String>,
        pairs: Vec<Pair>,
    ) -> Self {
        Self {
            name,
            extern_name,
            pairs,
        }
    }

    #[must_use]
    pub const fn name(&self) -> DeviceName {
        self.name
    }

    #[must_use]
    pub fn extern_name(&self) -> Option<&str> {
        self.extern_name.as_deref()
    }

    /// Pairs in match-priority order.
    #[must_use]
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Position of the pair answering `request`, if any.
    #[must_use]
    pub fn find_request(&self, request: &[u8]) -> Option<usize> {
        self.pairs.iter().position(|pair| pair.request() == request)
    }
}

/// Assembles a [`Configuration`]. Structural rules (supported interface,
/// unique device, unique request per device) are enforced here; size
/// limits and numbering are the validator's business.
#[derive(Clone, Debug)]
pub struct ConfigurationBuilder {
    profile: Profile,
    interfaces: BTreeMap<Interface, InterfaceDevices>,
}

impl ConfigurationBuilder {
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        let interfaces = profile
            .interfaces
            .iter()
            .map(|iface| (*iface, InterfaceDevices::default()))
            .collect();

        Self {
            profile,
            interfaces,
        }
    }

    pub fn add_device(
        &mut self,
        name: DeviceName,
        extern_name: Option<String>,
    ) -> Result<(), BuildError> {
        let devices = self
            .interfaces
            .get_mut(&name.iface())
            .ok_or(BuildError::UnsupportedInterface(name.iface(), self.profile.module))?;

        if devices.devices.contains_key(&name.index()) {
            return Err(BuildError::DuplicateDevice(name));
        }

        let _ignored = devices.devices.insert(
            name.index(),
            Device {
                name,
                extern_name,
                pairs: Vec::new(),
            },
        );

        Ok(())
    }

    /// Appends a pair to a device and returns its position.
    pub fn push_pair(&mut self, name: DeviceName, pair: Pair) -> Result<usize, BuildError> {
        let device = self
            .interfaces
            .get_mut(&name.iface())
            .and_then(|devices| devices.devices.get_mut(&name.index()))
            .ok_or(BuildError::UnknownDevice(name))?;

        if let Some(existing) = device.find_request(pair.request()) {
            return Err(BuildError::DuplicateRequest {
                device: name,
                existing,
            });
        }

        device.pairs.push(pair);

        Ok(device.pairs.len() - 1)
    }

    /// Inserts a device whose consistency the caller already guarantees.
    pub(crate) fn insert_unchecked(&mut self, device: Device) {
        let _ignored = self
            .interfaces
            .entry(device.name.iface())
            .or_default()
            .devices
            .insert(device.name.index(), device);
    }

    #[must_use]
    pub fn build(self) -> Configuration {
        Configuration {
            profile: self.profile,
            interfaces: self.interfaces,
        }
    }
}
