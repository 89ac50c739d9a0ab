// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Enumeration passes.
//!
//! Order matters: primaries (PCI, USB) first, then passes that enrich them,
//! then logical devices that merge into them, then leaf peripherals and
//! synthesized entries.

use std::collections::BTreeMap;

use super::classify::{self, category_for_pci_class};
use super::entry::{Category, DeviceEntry, DriverBinding};
use super::walk::{has_physical_ancestor, resolve_driver, walk_up, WalkOutcome};
use crate::config::InventoryConfig;
use crate::device::{keys, DeviceOrigin, RawDevice};
use crate::exec::CommandRunner;
use crate::extract::{self, ConnectorStatus};
use crate::ids::{normalize_id, IdResolver};
use crate::source::DeviceSource;

/// Logical subsystems folded onto a physical parent
const LOGICAL_PASSES: [(&str, Category); 3] = [
    ("net", Category::NetworkAdapters),
    ("block", Category::DiskDrives),
    ("tty", Category::Ports),
];

/// State of one refresh
pub(super) struct Build<'a> {
    config: &'a InventoryConfig,
    source: &'a dyn DeviceSource,
    resolver: &'a IdResolver,
    runner: &'a dyn CommandRunner,
    entries: BTreeMap<String, DeviceEntry>,
}

impl<'a> Build<'a> {
    pub(super) fn new(
        config: &'a InventoryConfig,
        source: &'a dyn DeviceSource,
        resolver: &'a IdResolver,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            config,
            source,
            resolver,
            runner,
            entries: BTreeMap::new(),
        }
    }

    pub(super) fn run(mut self) -> BTreeMap<String, DeviceEntry> {
        self.pci_pass();
        self.usb_pass();

        self.drm_pass();
        self.sound_pass();
        self.bluetooth_pass();

        for (subsystem, category) in LOGICAL_PASSES {
            self.logical_pass(subsystem, category);
        }

        self.input_pass();
        self.battery_pass();
        self.camera_pass();
        self.monitor_pass();

        self.processor_pass();
        self.memory_pass();

        self.finish()
    }

    // ---- primaries ----

    fn pci_pass(&mut self) {
        for dev in self.source.enumerate("pci") {
            let ids = extract::sysfs::pci_ids(self.source, &dev);
            let slot = dev
                .property(keys::PCI_SLOT_NAME)
                .unwrap_or(dev.sys_name())
                .to_string();
            let (vendor_id, model_id) = normalized(ids);
            let names = match (&vendor_id, &model_id) {
                (Some(v), Some(d)) => self.resolver.resolve_at("pci", v, d, Some(&slot)),
                _ => Default::default(),
            };
            let category = category_for_pci_class(extract::pci_class_byte(self.source, &dev));

            let vendor = names
                .vendor
                .or_else(|| dev.property(keys::ID_VENDOR_FROM_DATABASE).map(str::to_string))
                .or_else(|| vendor_id.clone());
            let name = names
                .device
                .or_else(|| dev.property(keys::ID_MODEL_FROM_DATABASE).map(str::to_string))
                .unwrap_or_else(|| classify::hex_label(vendor_id.as_deref(), model_id.as_deref()));

            let mut entry = self.entry(&dev, name, vendor, category);
            entry.vendor_id = vendor_id;
            entry.model_id = model_id;
            self.insert(entry);
        }
    }

    fn usb_pass(&mut self) {
        for dev in self.source.enumerate("usb") {
            if dev.devtype() != Some("usb_device") || self.is_usb_hub(&dev) {
                continue;
            }
            let (vendor_id, model_id) = normalized(extract::sysfs::usb_ids(self.source, &dev));
            let names = match (&vendor_id, &model_id) {
                (Some(v), Some(d)) => self.resolver.resolve("usb", v, d),
                _ => Default::default(),
            };

            let vendor = names
                .vendor
                .or_else(|| dev.property(keys::ID_VENDOR_FROM_DATABASE).map(str::to_string))
                .or_else(|| dev.property(keys::ID_VENDOR).map(classify::udev_text))
                .or_else(|| self.source.attribute(&dev, "manufacturer"))
                .or_else(|| vendor_id.clone());
            let name = names
                .device
                .or_else(|| dev.property(keys::ID_MODEL_FROM_DATABASE).map(str::to_string))
                .or_else(|| dev.property(keys::ID_MODEL).map(classify::udev_text))
                .or_else(|| self.source.attribute(&dev, "product"))
                .unwrap_or_else(|| classify::hex_label(vendor_id.as_deref(), model_id.as_deref()));

            let mut entry = self.entry(&dev, name, vendor, Category::UsbControllers);
            entry.vendor_id = vendor_id;
            entry.model_id = model_id;
            self.insert(entry);
        }
    }

    /// Root hubs (`usb1`, ...) and external hubs (device class 09).
    fn is_usb_hub(&self, dev: &RawDevice) -> bool {
        dev.sys_name().starts_with("usb")
            || self
                .source
                .attribute(dev, "bDeviceClass")
                .is_some_and(|c| c == "09")
    }

    // ---- enrichment ----

    fn drm_pass(&mut self) {
        for dev in self.source.enumerate("drm") {
            let is_card = is_card_node(dev.sys_name());
            if let Some(entry) = self.known_ancestor_mut(&dev) {
                entry.category = Category::DisplayAdapters;
                if is_card {
                    entry.add_logical_name(dev.sys_name());
                }
            }
        }
    }

    fn sound_pass(&mut self) {
        for dev in self.source.enumerate("sound") {
            if !is_card_node(dev.sys_name()) {
                continue;
            }
            if let Some(entry) = self.known_ancestor_mut(&dev) {
                entry.category = Category::SoundVideoGame;
                entry.add_logical_name(dev.sys_name());
            }
        }
    }

    fn bluetooth_pass(&mut self) {
        for dev in self.source.enumerate("bluetooth") {
            // `hci0:256` style children are connections, not adapters.
            if !dev.sys_name().starts_with("hci") || dev.sys_name().contains(':') {
                continue;
            }
            if let Some(entry) = self.known_ancestor_mut(&dev) {
                entry.category = Category::Bluetooth;
                entry.name = "Bluetooth Adapter".to_string();
                entry.add_logical_name(dev.sys_name());
            }
        }
    }

    // ---- logical -> physical ----

    fn logical_pass(&mut self, subsystem: &str, category: Category) {
        let devices = self.source.enumerate(subsystem);
        let partitions = if subsystem == "block" {
            partitions_by_disk(&devices)
        } else {
            BTreeMap::new()
        };

        for dev in devices {
            if subsystem == "block" && dev.devtype() != Some("disk") {
                continue;
            }
            let driver = resolve_driver(self.source, &dev);
            let size = (subsystem == "block")
                .then(|| extract::block_size_bytes(self.source, &dev))
                .flatten()
                .map(|bytes| extract::procfs::format_kib(bytes / 1024));
            let parts = partitions.get(dev.device_path()).cloned().unwrap_or_default();

            if let Some(entry) = self.known_ancestor_mut(&dev) {
                entry.category = category;
                if entry.driver.is_unbound() {
                    entry.driver = driver;
                }
                entry.add_logical_name(dev.sys_name());
                for part in &parts {
                    entry.add_logical_name(part);
                }
                if entry.description.is_none() {
                    entry.description = size;
                }
                continue;
            }

            let mut orphan = self.orphan_entry(&dev, subsystem, category, driver);
            for part in &parts {
                orphan.add_logical_name(part);
            }
            orphan.description = size;
            self.insert(orphan);
        }
    }

    /// Entry for a logical device with no known physical parent.
    fn orphan_entry(
        &self,
        dev: &RawDevice,
        subsystem: &str,
        category: Category,
        driver: DriverBinding,
    ) -> DeviceEntry {
        let node = dev.sys_name();
        let vendor = dev
            .property(keys::ID_VENDOR_FROM_DATABASE)
            .map(str::to_string)
            .or_else(|| dev.property(keys::ID_VENDOR).map(classify::udev_text));

        let (name, software) = match subsystem {
            "net" => {
                let model = dev
                    .property(keys::ID_MODEL_FROM_DATABASE)
                    .or_else(|| dev.property(keys::ID_MODEL));
                let software = classify::is_loopback(node) || classify::is_virtual_interface(node);
                (classify::network_name(node, model), software)
            }
            "block" => (self.disk_name(dev), classify::is_virtual_disk(node)),
            _ => {
                let name = if classify::is_usb_serial(node) {
                    classify::usb_serial_name(
                        node,
                        dev.property(keys::ID_VENDOR),
                        dev.property(keys::ID_MODEL),
                    )
                } else {
                    node.to_string()
                };
                (name, false)
            }
        };

        let mut entry = self.entry(dev, name, vendor, category);
        entry.driver = driver;
        entry.is_physical = !software
            && !dev.is_virtual()
            && has_physical_ancestor(self.source, dev, self.config.max_parent_depth);
        entry.is_hidden = dev.is_virtual()
            || software
            || (subsystem == "tty"
                && !classify::is_usb_serial(node)
                && !extract::tty_has_resource(self.source, dev));
        entry.add_logical_name(node);
        entry
    }

    /// `device/model`, then `ID_MODEL`, then `<name> Drive`.
    fn disk_name(&self, dev: &RawDevice) -> String {
        self.source
            .attribute(dev, "device/model")
            .or_else(|| dev.property(keys::ID_MODEL).map(classify::udev_text))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{} Drive", dev.sys_name()))
    }

    // ---- leaf peripherals ----

    fn input_pass(&mut self) {
        for dev in self.source.enumerate("input") {
            if !dev.sys_name().starts_with("event") {
                continue;
            }
            let category = if dev.flag(keys::ID_INPUT_KEYBOARD) {
                Category::Keyboards
            } else if dev.flag(keys::ID_INPUT_MOUSE) {
                Category::Mice
            } else {
                continue;
            };
            // The event node's parent `inputN` carries the device name.
            let name = self
                .source
                .parent(&dev)
                .and_then(|p| p.property(keys::NAME).map(|n| n.trim_matches('"').to_string()))
                .filter(|n| !n.is_empty())
                .or_else(|| dev.property(keys::ID_MODEL).map(classify::udev_text))
                .unwrap_or_else(|| dev.sys_name().to_string());
            let vendor = dev.property(keys::ID_VENDOR).map(classify::udev_text);
            let entry = self.leaf_entry(&dev, name, vendor, category);
            self.insert(entry);
        }
    }

    fn battery_pass(&mut self) {
        for dev in self.source.enumerate("power_supply") {
            let kind = dev
                .property(keys::POWER_SUPPLY_TYPE)
                .map(str::to_string)
                .or_else(|| self.source.attribute(&dev, "type"));
            if kind.as_deref() != Some("Battery") {
                continue;
            }
            let name = dev
                .property(keys::POWER_SUPPLY_MODEL_NAME)
                .map(str::to_string)
                .or_else(|| self.source.attribute(&dev, "model_name"))
                .unwrap_or_else(|| dev.sys_name().to_string());
            let vendor = dev
                .property(keys::POWER_SUPPLY_MANUFACTURER)
                .map(str::to_string)
                .or_else(|| self.source.attribute(&dev, "manufacturer"));
            let entry = self.leaf_entry(&dev, name, vendor, Category::Batteries);
            self.insert(entry);
        }
    }

    fn camera_pass(&mut self) {
        for dev in self.source.enumerate("video4linux") {
            if !self.is_capture_node(&dev) {
                continue;
            }
            let name = dev
                .property(keys::ID_V4L_PRODUCT)
                .map(str::to_string)
                .or_else(|| dev.property(keys::ID_MODEL).map(classify::udev_text))
                .or_else(|| dev.property(keys::ID_VENDOR).map(classify::udev_text))
                .unwrap_or_else(|| format!("Webcam ({})", dev.sys_name()));
            let vendor = dev.property(keys::ID_VENDOR).map(classify::udev_text);
            let entry = self.leaf_entry(&dev, name, vendor, Category::Cameras);
            self.insert(entry);
        }
    }

    /// udev marks capture nodes `:capture:`; without udev data only the
    /// first node of a device (index 0) is taken.
    fn is_capture_node(&self, dev: &RawDevice) -> bool {
        if !dev.sys_name().starts_with("video") {
            return false;
        }
        match dev.property(keys::ID_V4L_CAPABILITIES) {
            Some(caps) => caps.contains(":capture:"),
            None => self
                .source
                .attribute(dev, "index")
                .map_or(true, |i| i == "0"),
        }
    }

    fn monitor_pass(&mut self) {
        for dev in self.source.enumerate("drm") {
            let Some(connector) = connector_name(dev.sys_name()) else {
                continue;
            };
            if extract::connector_status(self.source, &dev) != Some(ConnectorStatus::Connected) {
                continue;
            }
            let name = extract::sysfs::edid_bytes(self.source, &dev)
                .and_then(|edid| extract::monitor_name(&edid))
                .unwrap_or_else(|| format!("Monitor ({})", connector));
            let mut entry = self.entry(&dev, name, None, Category::Monitors);
            entry.driver = resolve_driver(self.source, &dev);
            entry.is_physical = true;
            entry.is_hidden = false;
            self.insert(entry);
        }
    }

    // ---- synthesized ----

    fn processor_pass(&mut self) {
        for cpu in extract::read_cpuinfo(&self.config.procfs_root) {
            let dev = RawDevice::synthesized("cpu", format!("cpu{}", cpu.index));
            let name = cpu.model.unwrap_or_else(|| "Processor".to_string());
            let entry = self.synthesized_entry(&dev, name, cpu.vendor, Category::Processors);
            self.insert(entry);
        }
    }

    fn memory_pass(&mut self) {
        let modules = if self.config.tools.use_dmidecode {
            extract::memory_modules(self.runner, self.config.dmidecode_timeout())
        } else {
            Vec::new()
        };

        if !modules.is_empty() {
            for (i, module) in modules.into_iter().enumerate() {
                let dev = RawDevice::synthesized("memory", format!("memory{}", i));
                let mut entry = self.synthesized_entry(
                    &dev,
                    module.label(),
                    module.manufacturer.clone(),
                    Category::Memory,
                );
                entry.description = module.speed.clone();
                self.insert(entry);
            }
            return;
        }

        if let Some(kib) = extract::read_mem_total_kib(&self.config.procfs_root) {
            let dev = RawDevice::synthesized("memory", "memory");
            let mut entry =
                self.synthesized_entry(&dev, "System Memory".to_string(), None, Category::Memory);
            entry.description = Some(extract::procfs::format_kib(kib));
            self.insert(entry);
        }
    }

    // ---- helpers ----

    /// Base entry: physical unless under the virtual branch, driver resolved.
    fn entry(
        &self,
        dev: &RawDevice,
        name: String,
        vendor: Option<String>,
        category: Category,
    ) -> DeviceEntry {
        let is_virtual = dev.is_virtual();
        DeviceEntry {
            name,
            vendor,
            category,
            driver: resolve_driver(self.source, dev),
            subsystem: dev.subsystem().to_string(),
            sys_name: dev.sys_name().to_string(),
            sys_path: dev.sys_path().to_string(),
            device_path: dev.device_path().to_string(),
            is_hidden: is_virtual,
            is_physical: !is_virtual,
            driver_missing: false,
            vendor_id: None,
            model_id: None,
            logical_names: Vec::new(),
            description: None,
            origin: dev.origin(),
        }
    }

    fn leaf_entry(
        &self,
        dev: &RawDevice,
        name: String,
        vendor: Option<String>,
        category: Category,
    ) -> DeviceEntry {
        let mut entry = self.entry(dev, name, vendor, category);
        entry.add_logical_name(dev.sys_name());
        entry
    }

    fn synthesized_entry(
        &self,
        dev: &RawDevice,
        name: String,
        vendor: Option<String>,
        category: Category,
    ) -> DeviceEntry {
        let mut entry = self.entry(dev, name, vendor, category);
        entry.driver = DriverBinding::Unbound;
        entry.is_physical = true;
        entry.is_hidden = false;
        entry
    }

    /// Walk up to the nearest ancestor already in the map.
    fn known_ancestor_mut(&mut self, dev: &RawDevice) -> Option<&mut DeviceEntry> {
        let entries = &self.entries;
        let outcome = walk_up(self.source, dev, self.config.max_parent_depth, |a| {
            entries.contains_key(a.device_path())
        });
        match outcome {
            WalkOutcome::Found { ancestor, .. } => self.entries.get_mut(ancestor.device_path()),
            _ => None,
        }
    }

    /// First writer wins; a device reported twice is kept once.
    fn insert(&mut self, entry: DeviceEntry) {
        self.entries.entry(entry.device_path.clone()).or_insert(entry);
    }

    /// Flags that depend on the final state of each entry.
    fn finish(mut self) -> BTreeMap<String, DeviceEntry> {
        for entry in self.entries.values_mut() {
            // Synthesized entries have no kernel binding to miss.
            entry.driver_missing = entry.origin == DeviceOrigin::Kernel
                && entry.is_physical
                && entry.driver.is_unbound();
        }
        self.entries
    }
}

/// Normalize an optional raw ID pair.
fn normalized(ids: Option<(String, String)>) -> (Option<String>, Option<String>) {
    match ids {
        Some((v, d)) => (normalize_id(&v), normalize_id(&d)),
        None => (None, None),
    }
}

/// Partition names keyed by the device path of their disk, in kernel order.
fn partitions_by_disk(devices: &[RawDevice]) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for dev in devices.iter().filter(|d| d.devtype() == Some("partition")) {
        if let Some(disk) = dev.parent_path() {
            map.entry(disk.to_string())
                .or_default()
                .push(dev.sys_name().to_string());
        }
    }
    for names in map.values_mut() {
        names.sort_by(|a, b| natural_key(a).cmp(&natural_key(b)));
    }
    map
}

/// Sort key that orders `sda2` before `sda10`.
fn natural_key(name: &str) -> (String, u64) {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (stem, number) = name.split_at(name.len() - digits);
    (stem.to_string(), number.parse().unwrap_or(0))
}

/// `card0` but not `card0-HDMI-A-1` / `controlC0` / `pcmC0D0p`.
fn is_card_node(name: &str) -> bool {
    name.strip_prefix("card")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Connector part of a DRM connector node (`card0-HDMI-A-1` -> `HDMI-A-1`).
fn connector_name(name: &str) -> Option<&str> {
    let rest = name.strip_prefix("card")?;
    let (index, connector) = rest.split_once('-')?;
    (!index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) && !connector.is_empty())
        .then_some(connector)
}
