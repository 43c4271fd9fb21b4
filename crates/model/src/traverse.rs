//! Canonical-order walk over a [`Configuration`].
//!
//! Interfaces come in profile order, devices by ascending numeric index
//! (`tty9` before `tty10`), pairs in their stored order. Every callback may
//! stop the walk by returning [`ControlFlow::Break`]; the break value is
//! handed back to the caller untouched. Visitors that never break run to
//! completion.

#[cfg(test)]
#[path = "tests/traverse.rs"]
mod tests;

use std::ops::ControlFlow;

use hwemu_primitives::{Interface, Pair};

use crate::configuration::{Configuration, Device, InterfaceDevices};

pub trait Visitor {
    type Break;

    fn visit_interface(
        &mut self,
        _iface: Interface,
        _devices: &InterfaceDevices,
    ) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }

    fn visit_device(&mut self, _device: &Device) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }

    fn visit_pair(
        &mut self,
        _device: &Device,
        _index: usize,
        _pair: &Pair,
    ) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }
}

pub fn traverse<V: Visitor + ?Sized>(
    config: &Configuration,
    visitor: &mut V,
) -> ControlFlow<V::Break> {
    for (iface, devices) in config.interfaces() {
        if let ControlFlow::Break(value) = visitor.visit_interface(iface, devices) {
            return ControlFlow::Break(value);
        }

        for device in devices.iter() {
            if let ControlFlow::Break(value) = visitor.visit_device(device) {
                return ControlFlow::Break(value);
            }

            for (index, pair) in device.pairs().iter().enumerate() {
                if let ControlFlow::Break(value) = visitor.visit_pair(device, index, pair) {
                    return ControlFlow::Break(value);
                }
            }
        }
    }

    ControlFlow::Continue(())
}

impl Configuration {
    pub fn traverse<V: Visitor + ?Sized>(&self, visitor: &mut V) -> ControlFlow<V::Break> {
        traverse(self, visitor)
    }
}
