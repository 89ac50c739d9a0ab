// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Kernel device enumeration
//!
//! The aggregator never touches sysfs directly; it asks a [`DeviceSource`]
//! for subsystem listings, parents and attributes.
//!
//! - [`SysfsSource`]: live system (`/sys` + the udev runtime database)
//! - [`SimulatedSource`]: in-memory device graph for tests and benchmarks

mod simulated;
mod sysfs;

pub use simulated::SimulatedSource;
pub use sysfs::SysfsSource;

use crate::device::RawDevice;

/// Read-only view of the kernel device model.
///
/// Every accessor answers "absent" rather than failing: a device that
/// vanished between listing and lookup is indistinguishable from one that
/// never existed.
pub trait DeviceSource: Send + Sync {
    /// All devices currently registered under `subsystem`.
    fn enumerate(&self, subsystem: &str) -> Vec<RawDevice>;

    /// Look up a single device by its identity key.
    fn device(&self, device_path: &str) -> Option<RawDevice>;

    /// Raw bytes of an attribute file relative to the device directory
    /// (e.g. `edid`, `device/model`).
    fn attribute_bytes(&self, device: &RawDevice, name: &str) -> Option<Vec<u8>>;

    /// Parent device, if it is still present.
    fn parent(&self, device: &RawDevice) -> Option<RawDevice> {
        device.parent_path().and_then(|p| self.device(p))
    }

    /// Attribute as trimmed text; empty counts as absent.
    fn attribute(&self, device: &RawDevice, name: &str) -> Option<String> {
        self.attribute_bytes(device, name)
            .map(|b| String::from_utf8_lossy(&b).trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Whether an attribute file exists, regardless of its content.
    fn has_attribute(&self, device: &RawDevice, name: &str) -> bool {
        self.attribute_bytes(device, name).is_some()
    }
}
