#[cfg(test)]
#[path = "tests/render.rs"]
mod tests;

use std::convert::Infallible;
use std::fmt::Write as _;
use std::ops::ControlFlow;

use hwemu_primitives::Pair;
use serde::{Deserialize, Serialize};

use crate::configuration::{Configuration, Device};
use crate::traverse::Visitor;

/// What to put in a device's section header.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionStyle {
    /// `[tty0]`
    #[default]
    DeviceName,
    /// `[ttyHWE0]`, the recorded external name if the device has one.
    ExternName,
}

/// Renders `config` as INI text the validator accepts back unchanged.
#[must_use]
pub fn render_ini(config: &Configuration, style: SectionStyle) -> String {
    let mut writer = IniWriter {
        style,
        out: String::new(),
    };

    match config.traverse(&mut writer) {
        ControlFlow::Continue(()) => writer.out,
        ControlFlow::Break(never) => match never {},
    }
}

#[derive(Debug)]
struct IniWriter {
    style: SectionStyle,
    out: String,
}

impl Visitor for IniWriter {
    type Break = Infallible;

    fn visit_device(&mut self, device: &Device) -> ControlFlow<Self::Break> {
        if !self.out.is_empty() {
            self.out.push('\n');
        }

        let header = match (self.style, device.extern_name()) {
            (SectionStyle::ExternName, Some(name)) => name.to_owned(),
            (SectionStyle::ExternName, None) => device.name().extern_name(),
            (SectionStyle::DeviceName, _) => device.name().to_string(),
        };

        let _ignored = writeln!(self.out, "[{header}]");
        ControlFlow::Continue(())
    }

    fn visit_pair(&mut self, _device: &Device, _index: usize, pair: &Pair) -> ControlFlow<Self::Break> {
        let _ignored = writeln!(self.out, "{pair}");
        ControlFlow::Continue(())
    }
}
