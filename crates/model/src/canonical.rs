//! Canonical text form and the equality built on it.
//!
//! ```text
//! tty
//! tty/tty0
//! 0	0102=aabbcc
//! 1	6869=ff
//! i2c
//! ```
//!
//! One line per interface, one `<iface>/<device>` line per device, one
//! `<index>\t<pair>` line per pair. Pair order is significant, so this is
//! stricter than comparing pair sets.

#[cfg(test)]
#[path = "tests/canonical.rs"]
mod tests;

use std::convert::Infallible;
use std::fmt;
use std::ops::ControlFlow;

use hwemu_primitives::{Interface, Pair};
use similar::TextDiff;
use thiserror::Error;

use crate::configuration::{Configuration, Device, InterfaceDevices};
use crate::traverse::Visitor;

#[must_use]
pub fn serialize(config: &Configuration) -> String {
    let mut writer = CanonicalWriter::default();
    match config.traverse(&mut writer) {
        ControlFlow::Continue(()) => writer.out,
        ControlFlow::Break(never) => match never {},
    }
}

#[must_use]
pub fn equal(a: &Configuration, b: &Configuration) -> bool {
    serialize(a) == serialize(b)
}

/// Like [`equal`], but keeps both canonical forms for reporting.
pub fn compare(expected: &Configuration, actual: &Configuration) -> Result<(), ComparisonMismatch> {
    let expected = serialize(expected);
    let actual = serialize(actual);

    if expected == actual {
        return Ok(());
    }

    Err(ComparisonMismatch { expected, actual })
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("configurations differ")]
pub struct ComparisonMismatch {
    pub expected: String,
    pub actual: String,
}

impl ComparisonMismatch {
    /// Unified line diff of the two canonical forms.
    #[must_use]
    pub fn diff(&self) -> String {
        TextDiff::from_lines(&self.expected, &self.actual)
            .unified_diff()
            .context_radius(3)
            .header("written", "read back")
            .to_string()
    }
}

#[derive(Debug, Default)]
struct CanonicalWriter {
    out: String,
}

impl Visitor for CanonicalWriter {
    type Break = Infallible;

    fn visit_interface(
        &mut self,
        iface: Interface,
        _devices: &InterfaceDevices,
    ) -> ControlFlow<Self::Break> {
        self.out.push_str(iface.tag());
        self.out.push('\n');
        ControlFlow::Continue(())
    }

    fn visit_device(&mut self, device: &Device) -> ControlFlow<Self::Break> {
        let name = device.name();
        self.out.push_str(name.iface().tag());
        self.out.push('/');
        self.out.push_str(&name.to_string());
        self.out.push('\n');
        ControlFlow::Continue(())
    }

    fn visit_pair(&mut self, _device: &Device, index: usize, pair: &Pair) -> ControlFlow<Self::Break> {
        self.out.push_str(&index.to_string());
        self.out.push('\t');
        self.out.push_str(&pair.to_string());
        self.out.push('\n');
        ControlFlow::Continue(())
    }
}

/// Human summary: interfaces, devices and their pair counts.
#[must_use]
pub fn pretty(config: &Configuration) -> String {
    struct Summary(String);

    impl Visitor for Summary {
        type Break = Infallible;

        fn visit_interface(
            &mut self,
            iface: Interface,
            _devices: &InterfaceDevices,
        ) -> ControlFlow<Self::Break> {
            self.0.push_str(&format!("  {iface}:\n"));
            ControlFlow::Continue(())
        }

        fn visit_device(&mut self, device: &Device) -> ControlFlow<Self::Break> {
            self.0.push_str(&format!("    {}:\n", device.name()));
            self.0.push_str(&format!("      {} pair(s)\n", device.len()));
            ControlFlow::Continue(())
        }
    }

    let mut summary = Summary(String::new());
    match config.traverse(&mut summary) {
        ControlFlow::Continue(()) => summary.0,
        ControlFlow::Break(never) => match never {},
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize(self))
    }
}
