//! Leaf types shared by every hwemu crate.
//!
//! - [`Interface`]: the fixed set of emulated interface categories
//! - [`Profile`]: everything that differs between kernel module revisions
//! - [`hex`]: the request/response text codec
//! - [`Pair`] and [`DeviceName`]: the values that travel through sysfs

pub mod device;
pub mod hex;
pub mod iface;
pub mod pair;
pub mod profile;

pub use device::{DeviceName, DeviceNameError};
pub use iface::{Interface, UnknownInterface};
pub use pair::{Pair, PairError, Side};
pub use profile::{Limits, PairLayout, Profile, Revision};
