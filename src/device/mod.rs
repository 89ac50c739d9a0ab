// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Read-only device records produced by an enumeration pass.
//!
//! A [`RawDevice`] is either a kernel object read from sysfs/udev or a record
//! synthesized from a text source (`/proc/cpuinfo`, DMI tables). Both expose
//! the same accessors so the aggregator never branches on origin.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known property keys
pub mod keys {
    pub const DRIVER: &str = "DRIVER";
    pub const DEVTYPE: &str = "DEVTYPE";
    pub const PCI_ID: &str = "PCI_ID";
    pub const PCI_CLASS: &str = "PCI_CLASS";
    pub const PCI_SLOT_NAME: &str = "PCI_SLOT_NAME";
    pub const PRODUCT: &str = "PRODUCT";
    pub const INTERFACE: &str = "INTERFACE";
    pub const ID_VENDOR_ID: &str = "ID_VENDOR_ID";
    pub const ID_MODEL_ID: &str = "ID_MODEL_ID";
    pub const ID_VENDOR: &str = "ID_VENDOR";
    pub const ID_MODEL: &str = "ID_MODEL";
    pub const ID_VENDOR_FROM_DATABASE: &str = "ID_VENDOR_FROM_DATABASE";
    pub const ID_MODEL_FROM_DATABASE: &str = "ID_MODEL_FROM_DATABASE";
    pub const ID_INPUT_KEYBOARD: &str = "ID_INPUT_KEYBOARD";
    pub const ID_INPUT_MOUSE: &str = "ID_INPUT_MOUSE";
    pub const ID_V4L_PRODUCT: &str = "ID_V4L_PRODUCT";
    pub const ID_V4L_CAPABILITIES: &str = "ID_V4L_CAPABILITIES";
    pub const NAME: &str = "NAME";
    pub const POWER_SUPPLY_TYPE: &str = "POWER_SUPPLY_TYPE";
    pub const POWER_SUPPLY_MODEL_NAME: &str = "POWER_SUPPLY_MODEL_NAME";
    pub const POWER_SUPPLY_MANUFACTURER: &str = "POWER_SUPPLY_MANUFACTURER";
}

/// Where a device record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceOrigin {
    /// Kernel device model (sysfs, udev database)
    Kernel,
    /// Synthesized from a non-device source (cpuinfo, meminfo, DMI)
    Synthesized,
}

/// One device as seen during a single enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDevice {
    origin: DeviceOrigin,
    subsystem: String,
    sys_name: String,
    sys_path: String,
    device_path: String,
    parent_path: Option<String>,
    properties: BTreeMap<String, String>,
}

impl RawDevice {
    /// Kernel device. `device_path` is the sysfs path relative to the sysfs
    /// mount (udev's `DEVPATH`), e.g. `/devices/pci0000:00/0000:00:1f.6`.
    pub fn kernel(
        subsystem: impl Into<String>,
        sys_name: impl Into<String>,
        sys_path: impl Into<String>,
        device_path: impl Into<String>,
    ) -> Self {
        Self {
            origin: DeviceOrigin::Kernel,
            subsystem: subsystem.into(),
            sys_name: sys_name.into(),
            sys_path: sys_path.into(),
            device_path: device_path.into(),
            parent_path: None,
            properties: BTreeMap::new(),
        }
    }

    /// Device synthesized from a text source. Its identity lives under a
    /// `/synthetic/<subsystem>/` namespace that cannot collide with sysfs.
    pub fn synthesized(subsystem: impl Into<String>, sys_name: impl Into<String>) -> Self {
        let subsystem = subsystem.into();
        let sys_name = sys_name.into();
        let device_path = format!("/synthetic/{}/{}", subsystem, sys_name);
        Self {
            origin: DeviceOrigin::Synthesized,
            sys_path: device_path.clone(),
            device_path,
            subsystem,
            sys_name,
            parent_path: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent_path: impl Into<String>) -> Self {
        self.parent_path = Some(parent_path.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn origin(&self) -> DeviceOrigin {
        self.origin
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn sys_name(&self) -> &str {
        &self.sys_name
    }

    pub fn sys_path(&self) -> &str {
        &self.sys_path
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Identity of the parent device, if the kernel reported one.
    pub fn parent_path(&self) -> Option<&str> {
        self.parent_path.as_deref()
    }

    /// Property value; empty strings count as absent.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// True when the property is set to `1`.
    pub fn flag(&self, key: &str) -> bool {
        self.property(key) == Some("1")
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Directly bound kernel driver.
    pub fn driver(&self) -> Option<&str> {
        self.property(keys::DRIVER)
    }

    pub fn devtype(&self) -> Option<&str> {
        self.property(keys::DEVTYPE)
    }

    /// Lives under the kernel's synthetic `virtual` device branch.
    pub fn is_virtual(&self) -> bool {
        self.device_path.starts_with("/devices/virtual/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_device_accessors() {
        let dev = RawDevice::kernel(
            "pci",
            "0000:00:1f.6",
            "/sys/devices/pci0000:00/0000:00:1f.6",
            "/devices/pci0000:00/0000:00:1f.6",
        )
        .with_property("DRIVER", "e1000e")
        .with_property("PCI_CLASS", "20000");
        assert_eq!(dev.origin(), DeviceOrigin::Kernel);
        assert_eq!(dev.driver(), Some("e1000e"));
        assert_eq!(dev.property("PCI_CLASS"), Some("20000"));
        assert!(dev.property("ID_MODEL").is_none());
        assert!(!dev.is_virtual());
    }

    #[test]
    fn test_empty_property_is_absent() {
        let dev = RawDevice::kernel("net", "lo", "/sys/devices/virtual/net/lo", "/devices/virtual/net/lo")
            .with_property("DRIVER", "  ");
        assert!(dev.driver().is_none());
        assert!(dev.is_virtual());
    }

    #[test]
    fn test_synthesized_identity() {
        let cpu = RawDevice::synthesized("cpu", "cpu3");
        assert_eq!(cpu.origin(), DeviceOrigin::Synthesized);
        assert_eq!(cpu.device_path(), "/synthetic/cpu/cpu3");
        assert_eq!(cpu.sys_path(), cpu.device_path());
        assert!(cpu.parent_path().is_none());
    }

    #[test]
    fn test_flag() {
        let dev = RawDevice::kernel("input", "event3", "/sys/x", "/x")
            .with_property("ID_INPUT_KEYBOARD", "1")
            .with_property("ID_INPUT_MOUSE", "0");
        assert!(dev.flag("ID_INPUT_KEYBOARD"));
        assert!(!dev.flag("ID_INPUT_MOUSE"));
    }
}
