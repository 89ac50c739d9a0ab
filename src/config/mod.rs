// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Inventory configuration
//!
//! Every path the engine reads and every external-tool budget lives here, so
//! tests can point the aggregator at fixture trees and a deployment can tune
//! timeouts without code changes.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{InventoryError, Result};

/// Accepted hot-plug debounce delays, in milliseconds
pub const DEBOUNCE_MS_RANGE: RangeInclusive<u64> = 500..=1000;

/// External tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Query `systemd-hwdb` for vendor/model names
    pub use_hwdb: bool,
    /// Query `lspci` per slot when the databases have no answer
    pub use_lspci: bool,
    /// Run `dmidecode` for per-module memory records
    pub use_dmidecode: bool,
    /// Default timeout for tool invocations, in milliseconds
    pub timeout_ms: u64,
    /// Timeout for the (slower, privileged) DMI dump, in milliseconds
    pub dmidecode_timeout_ms: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            use_hwdb: true,
            use_lspci: true,
            use_dmidecode: true,
            timeout_ms: 3000,
            dmidecode_timeout_ms: 5000,
        }
    }
}

/// Hot-plug watcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotplugConfig {
    /// Subsystems whose uevents trigger a refresh
    pub subsystems: Vec<String>,
    /// Delay between the first event of a burst and the refresh
    pub debounce_ms: u64,
    /// How long one blocking read waits before re-checking for shutdown
    pub poll_interval_ms: u64,
}

impl Default for HotplugConfig {
    fn default() -> Self {
        Self {
            subsystems: ["usb", "input", "net", "block"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            debounce_ms: 500,
            poll_interval_ms: 250,
        }
    }
}

/// Root-action settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Privilege escalation program (`pkexec`, `sudo`, ...)
    pub escalation: String,
    /// Timeout for one privileged command, in milliseconds
    pub timeout_ms: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            escalation: "pkexec".into(),
            timeout_ms: 60_000,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// sysfs mount point
    pub sysfs_root: PathBuf,
    /// procfs mount point
    pub procfs_root: PathBuf,
    /// udev runtime database directory
    pub udev_data_dir: PathBuf,
    /// Candidate locations of `pci.ids`, first readable wins
    pub pci_ids_paths: Vec<PathBuf>,
    /// Candidate locations of `usb.ids`, first readable wins
    pub usb_ids_paths: Vec<PathBuf>,
    /// Maximum number of parent hops when folding logical devices
    pub max_parent_depth: usize,
    /// Capacity of the per-slot lspci name cache
    pub slot_cache_capacity: usize,
    /// Include hidden devices in rendered output
    pub show_hidden: bool,
    pub tools: ToolConfig,
    pub hotplug: HotplugConfig,
    pub actions: ActionConfig,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys"),
            procfs_root: PathBuf::from("/proc"),
            udev_data_dir: PathBuf::from("/run/udev/data"),
            pci_ids_paths: vec![
                PathBuf::from("/usr/share/hwdata/pci.ids"),
                PathBuf::from("/usr/share/misc/pci.ids"),
                PathBuf::from("/usr/share/pci.ids"),
            ],
            usb_ids_paths: vec![
                PathBuf::from("/usr/share/hwdata/usb.ids"),
                PathBuf::from("/usr/share/misc/usb.ids"),
                PathBuf::from("/var/lib/usbutils/usb.ids"),
            ],
            max_parent_depth: 4,
            slot_cache_capacity: 256,
            show_hidden: false,
            tools: ToolConfig::default(),
            hotplug: HotplugConfig::default(),
            actions: ActionConfig::default(),
        }
    }
}

impl InventoryConfig {
    /// Load from TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            InventoryError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !DEBOUNCE_MS_RANGE.contains(&self.hotplug.debounce_ms) {
            return Err(InventoryError::Configuration(format!(
                "hotplug.debounce_ms must be within {}..={}, got {}",
                DEBOUNCE_MS_RANGE.start(),
                DEBOUNCE_MS_RANGE.end(),
                self.hotplug.debounce_ms
            )));
        }
        if self.max_parent_depth == 0 || self.max_parent_depth > 16 {
            return Err(InventoryError::Configuration(format!(
                "max_parent_depth must be within 1..=16, got {}",
                self.max_parent_depth
            )));
        }
        if self.hotplug.subsystems.is_empty() {
            return Err(InventoryError::Configuration(
                "hotplug.subsystems must not be empty".into(),
            ));
        }
        if self.tools.timeout_ms == 0 || self.tools.dmidecode_timeout_ms == 0 {
            return Err(InventoryError::Configuration(
                "tool timeouts must be non-zero".into(),
            ));
        }
        if self.slot_cache_capacity == 0 {
            return Err(InventoryError::Configuration(
                "slot_cache_capacity must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tools.timeout_ms)
    }

    pub fn dmidecode_timeout(&self) -> Duration {
        Duration::from_millis(self.tools.dmidecode_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.hotplug.debounce_ms)
    }

    /// Generate sample config
    pub fn sample_toml() -> String {
        r#"# LinMan configuration
sysfs_root = "/sys"
procfs_root = "/proc"
udev_data_dir = "/run/udev/data"
max_parent_depth = 4
slot_cache_capacity = 256
show_hidden = false
# pci_ids_paths = ["/usr/share/hwdata/pci.ids"]
# usb_ids_paths = ["/usr/share/hwdata/usb.ids"]

[tools]
use_hwdb = true
use_lspci = true
use_dmidecode = true
timeout_ms = 3000
dmidecode_timeout_ms = 5000

[hotplug]
subsystems = ["usb", "input", "net", "block"]
debounce_ms = 500
poll_interval_ms = 250

[actions]
escalation = "pkexec"
timeout_ms = 60000
"#
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = InventoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.max_parent_depth, 4);
    }

    #[test]
    fn test_sample_round_trips() {
        let config = InventoryConfig::from_toml(&InventoryConfig::sample_toml()).unwrap();
        assert_eq!(config, InventoryConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = InventoryConfig::from_toml("show_hidden = true\n[hotplug]\ndebounce_ms = 800\n")
            .unwrap();
        assert!(config.show_hidden);
        assert_eq!(config.hotplug.debounce_ms, 800);
        assert_eq!(config.hotplug.subsystems.len(), 4);
        assert!(config.tools.use_lspci);
    }

    #[test]
    fn test_rejects_zero_depth() {
        let err = InventoryConfig::from_toml("max_parent_depth = 0").unwrap_err();
        assert!(err.to_string().contains("max_parent_depth"));
    }

    #[test]
    fn test_rejects_debounce_out_of_range() {
        assert!(InventoryConfig::from_toml("[hotplug]\ndebounce_ms = 10").is_err());
        assert!(InventoryConfig::from_toml("[hotplug]\ndebounce_ms = 499").is_err());
        assert!(InventoryConfig::from_toml("[hotplug]\ndebounce_ms = 1001").is_err());
        assert!(InventoryConfig::from_toml("[hotplug]\ndebounce_ms = 5000").is_err());
        assert!(InventoryConfig::from_toml("[hotplug]\ndebounce_ms = 1000").is_ok());
    }

    #[test]
    fn test_rejects_empty_allow_list() {
        assert!(InventoryConfig::from_toml("[hotplug]\nsubsystems = []").is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = InventoryConfig::from_toml("max_parent_depth = \"four\"").unwrap_err();
        assert!(matches!(err, InventoryError::Toml(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = InventoryConfig::from_toml_file("/nonexistent/linman.toml").unwrap_err();
        assert!(matches!(err, InventoryError::Configuration(_)));
    }
}
