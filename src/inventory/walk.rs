// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Bounded upward walks through the device tree

use super::entry::DriverBinding;
use crate::device::RawDevice;
use crate::source::DeviceSource;

/// Hops searched when resolving an inherited driver
pub const DRIVER_SEARCH_DEPTH: usize = 4;

/// Bridge driver that binds every PCIe port and says nothing about the
/// device below it
pub const BRIDGE_DRIVER: &str = "pcieport";

/// Device types that only relay a child to its real parent. They are still
/// offered to the matcher but do not consume a hop.
const PASS_THROUGH_DEVTYPES: [&str; 3] = ["scsi_host", "scsi_target", "usb_interface"];

/// Hard cap on ancestors visited, pass-through nodes included
const MAX_WALK_STEPS: usize = 32;

/// Why an upward walk stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    /// An ancestor matched after `hops` steps (1 = direct parent)
    Found { ancestor: RawDevice, hops: usize },
    /// The chain ended, or a parent vanished mid-walk
    NoParent,
    /// `max_depth` ancestors were checked without a match
    DepthExceeded,
}

impl WalkOutcome {
    pub fn ancestor(self) -> Option<RawDevice> {
        match self {
            WalkOutcome::Found { ancestor, .. } => Some(ancestor),
            _ => None,
        }
    }
}

/// Walk up from `device` (exclusive) through at most `max_depth` ancestors
/// and return the first one accepted by `matches`.
///
/// SCSI host/target and USB interface nodes do not count toward
/// `max_depth`, so a USB disk (`sdb -> 6:0:0:0 -> target -> host ->
/// 2-1:1.0 -> 2-1`) reaches its USB device in two counted hops.
pub fn walk_up<F>(
    source: &dyn DeviceSource,
    device: &RawDevice,
    max_depth: usize,
    mut matches: F,
) -> WalkOutcome
where
    F: FnMut(&RawDevice) -> bool,
{
    let mut current = device.clone();
    let mut hops = 0;
    for _ in 0..MAX_WALK_STEPS {
        let Some(parent) = source.parent(&current) else {
            return WalkOutcome::NoParent;
        };
        let counted = !is_pass_through(&parent);
        if counted {
            hops += 1;
        }
        if matches(&parent) {
            return WalkOutcome::Found {
                ancestor: parent,
                hops,
            };
        }
        if counted && hops >= max_depth {
            return WalkOutcome::DepthExceeded;
        }
        current = parent;
    }
    WalkOutcome::DepthExceeded
}

fn is_pass_through(device: &RawDevice) -> bool {
    device
        .devtype()
        .is_some_and(|t| PASS_THROUGH_DEVTYPES.contains(&t))
}

/// Own driver, else the nearest non-bridge ancestor driver.
pub fn resolve_driver(source: &dyn DeviceSource, device: &RawDevice) -> DriverBinding {
    if let Some(driver) = device.driver() {
        return DriverBinding::Bound(driver.to_string());
    }
    let outcome = walk_up(source, device, DRIVER_SEARCH_DEPTH, |a| {
        a.driver().is_some_and(|d| d != BRIDGE_DRIVER)
    });
    match outcome.ancestor().and_then(|a| a.driver().map(str::to_string)) {
        Some(driver) => DriverBinding::Inherited(driver),
        None => DriverBinding::Unbound,
    }
}

/// Whether real hardware backs this device: some ancestor within
/// `max_depth` is outside the virtual branch and has a driver.
pub fn has_physical_ancestor(source: &dyn DeviceSource, device: &RawDevice, max_depth: usize) -> bool {
    matches!(
        walk_up(source, device, max_depth, |a| !a.is_virtual() && a.driver().is_some()),
        WalkOutcome::Found { .. }
    )
}
