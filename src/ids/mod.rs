// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Vendor/model name resolution
//!
//! Sources are consulted in a fixed order and the first answer per field
//! wins:
//!
//! 1. the systemd hardware database (`systemd-hwdb query`)
//! 2. the flat `pci.ids` / `usb.ids` files
//! 3. PCI only: a live `lspci -mm -s <slot>` query, cached per slot
//!
//! Nothing here fails. A missing tool or file simply contributes nothing
//! and the caller falls back to raw properties or hex IDs.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use linman::config::InventoryConfig;
//! use linman::exec::SystemRunner;
//! use linman::ids::IdResolver;
//!
//! let resolver = IdResolver::new(&InventoryConfig::default(), Arc::new(SystemRunner));
//! let names = resolver.resolve("pci", "0x8086", "15BC");
//! println!("{:?} {:?}", names.vendor, names.device);
//! ```

mod hwdb;
mod idfile;
mod lspci;

pub use hwdb::Hwdb;
pub use idfile::IdDatabase;
pub use lspci::SlotLookup;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::InventoryConfig;
use crate::exec::CommandRunner;

/// Vendor and device names, either may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdLookupResult {
    pub vendor: Option<String>,
    pub device: Option<String>,
}

impl IdLookupResult {
    pub fn is_complete(&self) -> bool {
        self.vendor.is_some() && self.device.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.vendor.is_none() && self.device.is_none()
    }

    /// Fill whichever fields are still missing from `other`.
    fn fill_from(&mut self, other: IdLookupResult) {
        if self.vendor.is_none() {
            self.vendor = other.vendor;
        }
        if self.device.is_none() {
            self.device = other.device;
        }
    }
}

/// Lower-case hex with any `0x` prefix removed; `None` when empty or not hex.
pub fn normalize_id(id: &str) -> Option<String> {
    let id = id.trim().to_ascii_lowercase();
    let id = id.strip_prefix("0x").unwrap_or(&id);
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(id.to_string())
}

/// Prioritized name resolver
pub struct IdResolver {
    hwdb: Option<Hwdb>,
    pci_ids: IdDatabase,
    usb_ids: IdDatabase,
    slots: Option<SlotLookup>,
}

impl IdResolver {
    /// Build from configuration. ID files are read and `systemd-hwdb` is
    /// probed here, once.
    pub fn new(config: &InventoryConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let timeout = config.tool_timeout();
        let hwdb = if config.tools.use_hwdb {
            Hwdb::probe(runner.clone(), timeout, config.slot_cache_capacity)
        } else {
            None
        };
        let slots = config
            .tools
            .use_lspci
            .then(|| SlotLookup::new(runner, timeout, config.slot_cache_capacity));
        Self {
            hwdb,
            pci_ids: IdDatabase::load_first(&config.pci_ids_paths),
            usb_ids: IdDatabase::load_first(&config.usb_ids_paths),
            slots,
        }
    }

    /// Assemble from explicit parts.
    pub fn from_parts(
        hwdb: Option<Hwdb>,
        pci_ids: IdDatabase,
        usb_ids: IdDatabase,
        slots: Option<SlotLookup>,
    ) -> Self {
        Self {
            hwdb,
            pci_ids,
            usb_ids,
            slots,
        }
    }

    /// Resolver with no sources at all.
    pub fn offline() -> Self {
        Self::from_parts(None, IdDatabase::empty(), IdDatabase::empty(), None)
    }

    /// Resolve names from the databases only.
    pub fn resolve(&self, subsystem: &str, vendor_id: &str, device_id: &str) -> IdLookupResult {
        self.resolve_at(subsystem, vendor_id, device_id, None)
    }

    /// Resolve names, falling back to a live slot query for PCI devices.
    pub fn resolve_at(
        &self,
        subsystem: &str,
        vendor_id: &str,
        device_id: &str,
        slot: Option<&str>,
    ) -> IdLookupResult {
        let (Some(vendor_id), Some(device_id)) = (normalize_id(vendor_id), normalize_id(device_id))
        else {
            return IdLookupResult::default();
        };

        let mut result = IdLookupResult::default();

        if let Some(hwdb) = &self.hwdb {
            result.fill_from(hwdb.lookup(subsystem, &vendor_id, &device_id));
        }

        if !result.is_complete() {
            if let Some(db) = self.id_file(subsystem) {
                result.fill_from(IdLookupResult {
                    vendor: db.vendor(&vendor_id).map(str::to_string),
                    device: db.device(&vendor_id, &device_id).map(str::to_string),
                });
            }
        }

        if !result.is_complete() && subsystem == "pci" {
            if let (Some(slots), Some(slot)) = (&self.slots, slot) {
                result.fill_from(slots.lookup(slot));
            }
        }

        if result.is_empty() {
            log::debug!("No name for {} {}:{}", subsystem, vendor_id, device_id);
        }
        result
    }

    fn id_file(&self, subsystem: &str) -> Option<&IdDatabase> {
        match subsystem {
            "pci" => Some(&self.pci_ids),
            "usb" => Some(&self.usb_ids),
            _ => None,
        }
    }
}
