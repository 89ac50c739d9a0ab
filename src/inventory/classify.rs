// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Taxonomy and visibility rules

use super::entry::Category;

/// Interface-name fragments of software network devices
pub const VIRTUAL_NET_MARKERS: &[&str] = &[
    "virbr", "docker", "br-", "veth", "tun", "tap", "tailscale", "wg", "wireguard", "vnet",
    "dummy", "bond", "team", "ipsec", "ppp", "zt",
];

/// Block-device name prefixes of software disks
pub const VIRTUAL_DISK_PREFIXES: &[&str] = &["loop", "ram", "zram", "dm-"];

/// Serial node prefixes that are always shown
pub const USB_SERIAL_PREFIXES: &[&str] = &["ttyUSB", "ttyACM"];

/// Category for a PCI base class byte.
pub fn category_for_pci_class(class: Option<u8>) -> Category {
    match class {
        Some(0x01) => Category::StorageControllers,
        Some(0x02) => Category::NetworkAdapters,
        Some(0x03) => Category::DisplayAdapters,
        Some(0x04) => Category::SoundVideoGame,
        Some(0x05) => Category::MemoryTechnologyDevices,
        Some(0x07) => Category::Ports,
        Some(0x09) => Category::HumanInterfaceDevices,
        Some(0x0c) => Category::UsbControllers,
        _ => Category::SystemDevices,
    }
}

pub fn is_loopback(iface: &str) -> bool {
    iface == "lo"
}

pub fn is_virtual_interface(iface: &str) -> bool {
    VIRTUAL_NET_MARKERS.iter().any(|m| iface.contains(m))
}

pub fn is_virtual_disk(name: &str) -> bool {
    VIRTUAL_DISK_PREFIXES.iter().any(|p| name.starts_with(p))
}

pub fn is_usb_serial(node: &str) -> bool {
    USB_SERIAL_PREFIXES.iter().any(|p| node.starts_with(p))
}

/// udev encodes spaces in `ID_VENDOR`/`ID_MODEL` as underscores.
pub fn udev_text(value: &str) -> String {
    value.replace('_', " ").trim().to_string()
}

/// `ttyUSB0 - FTDI FT232R USB UART`
pub fn usb_serial_name(node: &str, vendor: Option<&str>, model: Option<&str>) -> String {
    let label: Vec<String> = [vendor, model]
        .into_iter()
        .flatten()
        .map(udev_text)
        .filter(|s| !s.is_empty())
        .collect();
    if label.is_empty() {
        node.to_string()
    } else {
        format!("{} - {}", node, label.join(" "))
    }
}

/// `Ethernet Connection I219-V (eth0)`, or just the interface name.
pub fn network_name(iface: &str, model: Option<&str>) -> String {
    match model.map(udev_text).filter(|m| !m.is_empty()) {
        Some(model) => format!("{} ({})", model, iface),
        None => iface.to_string(),
    }
}

/// Raw hex label used when no name source answered
pub fn hex_label(vendor_id: Option<&str>, model_id: Option<&str>) -> String {
    match (vendor_id, model_id) {
        (Some(v), Some(d)) => format!("{}:{}", v, d),
        _ => "Unknown Device".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pci_class_table() {
        assert_eq!(category_for_pci_class(Some(0x02)), Category::NetworkAdapters);
        assert_eq!(category_for_pci_class(Some(0x0c)), Category::UsbControllers);
        assert_eq!(category_for_pci_class(Some(0x06)), Category::SystemDevices);
        assert_eq!(category_for_pci_class(None), Category::SystemDevices);
    }

    #[test]
    fn test_virtual_interfaces() {
        for iface in ["virbr0", "docker0", "br-1a2b", "veth12ab", "tun0", "tap3", "tailscale0", "wg0", "ppp0", "ztabc"] {
            assert!(is_virtual_interface(iface), "{iface}");
        }
        for iface in ["eth0", "enp0s31f6", "wlp2s0", "wlan0"] {
            assert!(!is_virtual_interface(iface), "{iface}");
        }
        assert!(is_loopback("lo"));
        assert!(!is_loopback("lo0x"));
    }

    #[test]
    fn test_virtual_disks() {
        assert!(is_virtual_disk("loop7"));
        assert!(is_virtual_disk("zram0"));
        assert!(is_virtual_disk("dm-1"));
        assert!(!is_virtual_disk("sda"));
        assert!(!is_virtual_disk("nvme0n1"));
    }

    #[test]
    fn test_usb_serial_name() {
        assert_eq!(
            usb_serial_name("ttyUSB0", Some("FTDI"), Some("FT232R_USB_UART")),
            "ttyUSB0 - FTDI FT232R USB UART"
        );
        assert_eq!(usb_serial_name("ttyACM0", None, None), "ttyACM0");
        assert!(is_usb_serial("ttyACM0"));
        assert!(!is_usb_serial("ttyS0"));
    }

    #[test]
    fn test_network_name_and_hex_label() {
        assert_eq!(network_name("eth0", Some("I219-V")), "I219-V (eth0)");
        assert_eq!(network_name("eth0", None), "eth0");
        assert_eq!(hex_label(Some("8086"), Some("15bc")), "8086:15bc");
        assert_eq!(hex_label(None, Some("15bc")), "Unknown Device");
    }
}
