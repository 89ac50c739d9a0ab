// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! In-memory device graph

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::DeviceSource;
use crate::device::RawDevice;

/// Simulated kernel device model.
///
/// Devices are keyed by `device_path`; attributes are stored per device.
/// The graph can be mutated through `&self` so tests can simulate hot-plug
/// while an aggregator holds a shared handle.
#[derive(Debug, Default)]
pub struct SimulatedSource {
    devices: RwLock<BTreeMap<String, RawDevice>>,
    attributes: RwLock<BTreeMap<(String, String), Vec<u8>>>,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(self, device: RawDevice) -> Self {
        self.insert(device);
        self
    }

    /// Builder form of [`set_attribute`](Self::set_attribute).
    pub fn with_attribute(self, device_path: &str, name: &str, value: impl Into<Vec<u8>>) -> Self {
        self.set_attribute(device_path, name, value);
        self
    }

    pub fn insert(&self, device: RawDevice) {
        self.devices
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(device.device_path().to_string(), device);
    }

    /// Remove a device and its attributes (simulated unplug).
    pub fn remove(&self, device_path: &str) -> Option<RawDevice> {
        self.attributes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(path, _), _| path != device_path);
        self.devices
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(device_path)
    }

    pub fn set_attribute(&self, device_path: &str, name: &str, value: impl Into<Vec<u8>>) {
        self.attributes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((device_path.to_string(), name.to_string()), value.into());
    }

    pub fn len(&self) -> usize {
        self.devices.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeviceSource for SimulatedSource {
    fn enumerate(&self, subsystem: &str) -> Vec<RawDevice> {
        self.devices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|d| d.subsystem() == subsystem)
            .cloned()
            .collect()
    }

    fn device(&self, device_path: &str) -> Option<RawDevice> {
        self.devices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(device_path)
            .cloned()
    }

    fn attribute_bytes(&self, device: &RawDevice, name: &str) -> Option<Vec<u8>> {
        self.attributes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(device.device_path().to_string(), name.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nic() -> RawDevice {
        RawDevice::kernel(
            "pci",
            "0000:00:1f.6",
            "/sys/devices/pci0000:00/0000:00:1f.6",
            "/devices/pci0000:00/0000:00:1f.6",
        )
    }

    #[test]
    fn test_enumerate_filters_by_subsystem() {
        let eth0 = RawDevice::kernel(
            "net",
            "eth0",
            "/sys/devices/pci0000:00/0000:00:1f.6/net/eth0",
            "/devices/pci0000:00/0000:00:1f.6/net/eth0",
        )
        .with_parent("/devices/pci0000:00/0000:00:1f.6");
        let source = SimulatedSource::new().with(nic()).with(eth0);
        assert_eq!(source.enumerate("pci").len(), 1);
        let nets = source.enumerate("net");
        assert_eq!(nets.len(), 1);
        assert_eq!(source.parent(&nets[0]).unwrap().sys_name(), "0000:00:1f.6");
        assert!(source.enumerate("usb").is_empty());
    }

    #[test]
    fn test_attributes_and_removal() {
        let path = "/devices/pci0000:00/0000:00:1f.6";
        let source = SimulatedSource::new()
            .with(nic())
            .with_attribute(path, "class", "0x020000\n");
        let dev = source.device(path).unwrap();
        assert_eq!(source.attribute(&dev, "class").as_deref(), Some("0x020000"));
        assert!(source.has_attribute(&dev, "class"));
        assert!(!source.has_attribute(&dev, "resource"));

        source.remove(path);
        assert!(source.is_empty());
        assert!(source.attribute(&dev, "class").is_none());
    }

    #[test]
    fn test_dangling_parent_is_absent() {
        let orphan = RawDevice::kernel("net", "eth9", "/sys/x", "/x").with_parent("/gone");
        let source = SimulatedSource::new().with(orphan.clone());
        assert!(source.parent(&orphan).is_none());
    }
}
