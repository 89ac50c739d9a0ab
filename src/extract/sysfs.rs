// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Single-value sysfs attribute readers

use serde::{Deserialize, Serialize};

use crate::device::{keys, RawDevice};
use crate::source::DeviceSource;

/// PCI base class byte (`0x02` for network controllers).
///
/// Reads the `class` attribute (`0x020000`), falling back to the
/// `PCI_CLASS` uevent property (`20000`).
pub fn pci_class_byte(source: &dyn DeviceSource, device: &RawDevice) -> Option<u8> {
    source
        .attribute(device, "class")
        .and_then(|s| parse_class_code(&s))
        .or_else(|| device.property(keys::PCI_CLASS).and_then(parse_class_code))
}

/// Base class byte of a 24-bit class code in hex.
pub fn parse_class_code(s: &str) -> Option<u8> {
    let s = s.trim();
    let hex = s.strip_prefix("0x").unwrap_or(s);
    let code = u32::from_str_radix(hex, 16).ok()?;
    if code > 0xFF_FFFF {
        return None;
    }
    Some((code >> 16) as u8)
}

/// DRM connector status as exposed in `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorStatus {
    Connected,
    Disconnected,
    Unknown,
}

pub fn connector_status(source: &dyn DeviceSource, connector: &RawDevice) -> Option<ConnectorStatus> {
    let status = source.attribute(connector, "status")?;
    Some(match status.as_str() {
        "connected" => ConnectorStatus::Connected,
        "disconnected" => ConnectorStatus::Disconnected,
        _ => ConnectorStatus::Unknown,
    })
}

/// Whether a tty node exposes a hardware resource, the signal that a
/// legacy serial port is backed by real hardware.
pub fn tty_has_resource(source: &dyn DeviceSource, tty: &RawDevice) -> bool {
    ["resource", "device/resources", "device/resource"]
        .iter()
        .any(|name| source.has_attribute(tty, name))
}

/// Raw EDID blob of a DRM connector.
pub fn edid_bytes(source: &dyn DeviceSource, connector: &RawDevice) -> Option<Vec<u8>> {
    source
        .attribute_bytes(connector, "edid")
        .filter(|b| !b.is_empty())
}

/// Vendor/device ID pair of a PCI function: `vendor`/`device` attributes,
/// else the `PCI_ID` property (`8086:15BC`).
pub fn pci_ids(source: &dyn DeviceSource, device: &RawDevice) -> Option<(String, String)> {
    if let (Some(v), Some(d)) = (
        source.attribute(device, "vendor"),
        source.attribute(device, "device"),
    ) {
        return Some((v, d));
    }
    let (v, d) = device.property(keys::PCI_ID)?.split_once(':')?;
    Some((v.to_string(), d.to_string()))
}

/// Vendor/product ID pair of a USB device: `ID_VENDOR_ID`/`ID_MODEL_ID`,
/// `idVendor`/`idProduct` attributes, else the `PRODUCT` property
/// (`46d/c52b/1211`).
pub fn usb_ids(source: &dyn DeviceSource, device: &RawDevice) -> Option<(String, String)> {
    if let (Some(v), Some(d)) = (
        device.property(keys::ID_VENDOR_ID),
        device.property(keys::ID_MODEL_ID),
    ) {
        return Some((v.to_string(), d.to_string()));
    }
    if let (Some(v), Some(d)) = (
        source.attribute(device, "idVendor"),
        source.attribute(device, "idProduct"),
    ) {
        return Some((v, d));
    }
    let mut parts = device.property(keys::PRODUCT)?.split('/');
    let v = parts.next()?;
    let d = parts.next()?;
    Some((format!("{:0>4}", v), format!("{:0>4}", d)))
}

/// Capacity of a block device in bytes. The `size` attribute counts
/// 512-byte sectors whatever the logical block size; zero means no media.
pub fn block_size_bytes(source: &dyn DeviceSource, block: &RawDevice) -> Option<u64> {
    let sectors: u64 = source.attribute(block, "size")?.trim().parse().ok()?;
    (sectors > 0).then(|| sectors.saturating_mul(512))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SimulatedSource;

    const PATH: &str = "/devices/pci0000:00/0000:00:1f.6";

    fn dev() -> RawDevice {
        RawDevice::kernel("pci", "0000:00:1f.6", "/sys/x", PATH)
    }

    #[test]
    fn test_parse_class_code() {
        assert_eq!(parse_class_code("0x020000"), Some(0x02));
        assert_eq!(parse_class_code("30000"), Some(0x03));
        assert_eq!(parse_class_code("0x0c0330\n"), Some(0x0c));
        assert_eq!(parse_class_code("garbage"), None);
        assert_eq!(parse_class_code("0x1000000"), None);
    }

    #[test]
    fn test_class_attribute_then_property() {
        let source = SimulatedSource::new().with_attribute(PATH, "class", "0x030000\n");
        assert_eq!(pci_class_byte(&source, &dev()), Some(0x03));

        let empty = SimulatedSource::new();
        let with_prop = dev().with_property("PCI_CLASS", "20000");
        assert_eq!(pci_class_byte(&empty, &with_prop), Some(0x02));
        assert_eq!(pci_class_byte(&empty, &dev()), None);
    }

    #[test]
    fn test_connector_status() {
        let source = SimulatedSource::new().with_attribute(PATH, "status", "connected\n");
        assert_eq!(connector_status(&source, &dev()), Some(ConnectorStatus::Connected));
        assert_eq!(connector_status(&SimulatedSource::new(), &dev()), None);
    }

    #[test]
    fn test_tty_resource() {
        let source = SimulatedSource::new().with_attribute(PATH, "device/resources", "io 0x3f8-0x3ff\n");
        assert!(tty_has_resource(&source, &dev()));
        assert!(!tty_has_resource(&SimulatedSource::new(), &dev()));
    }

    #[test]
    fn test_pci_ids_fallback_to_property() {
        let source = SimulatedSource::new();
        let d = dev().with_property("PCI_ID", "8086:15BC");
        assert_eq!(pci_ids(&source, &d), Some(("8086".into(), "15BC".into())));
        assert!(pci_ids(&source, &dev()).is_none());
    }

    #[test]
    fn test_block_size() {
        let source = SimulatedSource::new().with_attribute(PATH, "size", "30031872\n");
        assert_eq!(block_size_bytes(&source, &dev()), Some(15_376_318_464));

        let empty_reader = SimulatedSource::new().with_attribute(PATH, "size", "0");
        assert_eq!(block_size_bytes(&empty_reader, &dev()), None);
        assert_eq!(block_size_bytes(&SimulatedSource::new(), &dev()), None);
    }

    #[test]
    fn test_usb_ids_from_product() {
        let source = SimulatedSource::new();
        let d = RawDevice::kernel("usb", "1-2", "/sys/y", "/y").with_property("PRODUCT", "46d/c52b/1211");
        assert_eq!(usb_ids(&source, &d), Some(("046d".into(), "c52b".into())));
    }
}
