// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Inventory entry types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::device::DeviceOrigin;

/// Fixed device taxonomy.
///
/// Declaration order is the display order (alphabetical by label), so
/// `Ord` can be used directly for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Batteries")]
    Batteries,
    #[serde(rename = "Bluetooth")]
    Bluetooth,
    #[serde(rename = "Cameras")]
    Cameras,
    #[serde(rename = "Disk drives")]
    DiskDrives,
    #[serde(rename = "Display adapters")]
    DisplayAdapters,
    #[serde(rename = "Human Interface Devices")]
    HumanInterfaceDevices,
    #[serde(rename = "Keyboards")]
    Keyboards,
    #[serde(rename = "Memory")]
    Memory,
    #[serde(rename = "Memory technology devices")]
    MemoryTechnologyDevices,
    #[serde(rename = "Mice and other pointing devices")]
    Mice,
    #[serde(rename = "Monitors")]
    Monitors,
    #[serde(rename = "Network adapters")]
    NetworkAdapters,
    #[serde(rename = "Ports (COM & LPT)")]
    Ports,
    #[serde(rename = "Processors")]
    Processors,
    #[serde(rename = "Sound, video and game controllers")]
    SoundVideoGame,
    #[serde(rename = "Storage controllers")]
    StorageControllers,
    #[serde(rename = "System devices")]
    SystemDevices,
    #[serde(rename = "Universal Serial Bus controllers")]
    UsbControllers,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 18] = [
        Category::Batteries,
        Category::Bluetooth,
        Category::Cameras,
        Category::DiskDrives,
        Category::DisplayAdapters,
        Category::HumanInterfaceDevices,
        Category::Keyboards,
        Category::Memory,
        Category::MemoryTechnologyDevices,
        Category::Mice,
        Category::Monitors,
        Category::NetworkAdapters,
        Category::Ports,
        Category::Processors,
        Category::SoundVideoGame,
        Category::StorageControllers,
        Category::SystemDevices,
        Category::UsbControllers,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Batteries => "Batteries",
            Category::Bluetooth => "Bluetooth",
            Category::Cameras => "Cameras",
            Category::DiskDrives => "Disk drives",
            Category::DisplayAdapters => "Display adapters",
            Category::HumanInterfaceDevices => "Human Interface Devices",
            Category::Keyboards => "Keyboards",
            Category::Memory => "Memory",
            Category::MemoryTechnologyDevices => "Memory technology devices",
            Category::Mice => "Mice and other pointing devices",
            Category::Monitors => "Monitors",
            Category::NetworkAdapters => "Network adapters",
            Category::Ports => "Ports (COM & LPT)",
            Category::Processors => "Processors",
            Category::SoundVideoGame => "Sound, video and game controllers",
            Category::StorageControllers => "Storage controllers",
            Category::SystemDevices => "System devices",
            Category::UsbControllers => "Universal Serial Bus controllers",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How an entry's driver was determined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "binding", content = "name", rename_all = "snake_case")]
pub enum DriverBinding {
    /// Bound directly to this device
    Bound(String),
    /// Found on an ancestor
    Inherited(String),
    /// No driver anywhere within reach
    Unbound,
}

impl DriverBinding {
    pub fn name(&self) -> Option<&str> {
        match self {
            DriverBinding::Bound(name) | DriverBinding::Inherited(name) => Some(name),
            DriverBinding::Unbound => None,
        }
    }

    pub fn is_unbound(&self) -> bool {
        matches!(self, DriverBinding::Unbound)
    }
}

impl Default for DriverBinding {
    fn default() -> Self {
        DriverBinding::Unbound
    }
}

impl fmt::Display for DriverBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverBinding::Bound(name) => f.write_str(name),
            DriverBinding::Inherited(name) => write!(f, "{} (via parent)", name),
            DriverBinding::Unbound => Ok(()),
        }
    }
}

/// One row of the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Display name
    pub name: String,
    pub vendor: Option<String>,
    pub category: Category,
    pub driver: DriverBinding,
    pub subsystem: String,
    pub sys_name: String,
    pub sys_path: String,
    /// Identity key
    pub device_path: String,
    pub is_hidden: bool,
    pub is_physical: bool,
    /// Physical device without any driver
    pub driver_missing: bool,
    /// Normalized hex vendor ID
    pub vendor_id: Option<String>,
    /// Normalized hex device/product ID
    pub model_id: Option<String>,
    /// Kernel names folded into this entry (`eth0`, `ttyUSB0`, `hci0`, ...)
    pub logical_names: Vec<String>,
    /// Extra line shown under the name (memory size, speed, ...)
    pub description: Option<String>,
    pub origin: DeviceOrigin,
}

impl DeviceEntry {
    /// Record a folded kernel name once.
    pub fn add_logical_name(&mut self, name: &str) {
        if !self.logical_names.iter().any(|n| n == name) {
            self.logical_names.push(name.to_string());
        }
    }

    /// Plain-text property sheet (clipboard / properties dialog).
    pub fn details(&self) -> String {
        let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "Unknown".to_string());
        let driver = match &self.driver {
            DriverBinding::Unbound => "None".to_string(),
            other => other.to_string(),
        };

        let mut lines = vec![
            format!("Name: {}", self.name),
            format!("Vendor: {}", or_unknown(&self.vendor)),
            format!("Category: {}", self.category),
        ];
        if let Some(desc) = &self.description {
            lines.push(format!("Description: {}", desc));
        }
        lines.extend([
            format!("Subsystem: {}", self.subsystem),
            format!("Device Path: {}", self.device_path),
            format!("Sys Name: {}", self.sys_name),
            format!("Vendor ID: {}", or_unknown(&self.vendor_id)),
            format!("Model ID: {}", or_unknown(&self.model_id)),
            format!("Driver: {}", driver),
        ]);
        if !self.logical_names.is_empty() {
            lines.push(format!("Logical Names: {}", self.logical_names.join(", ")));
        }
        if self.is_hidden {
            lines.push("Hidden: yes".to_string());
        }
        if self.driver_missing {
            lines.push("Status: driver missing".to_string());
        }
        lines.join("\n")
    }
}
