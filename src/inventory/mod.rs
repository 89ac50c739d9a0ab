// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Device aggregation
//!
//! The [`Aggregator`] turns one enumeration of the kernel device model into a
//! [`Snapshot`]: a map from device path to [`DeviceEntry`] holding exactly one
//! entry per physical device. Logical kernel objects (network interfaces,
//! disks, serial nodes, DRM/sound/bluetooth nodes) are folded onto the PCI or
//! USB device that backs them.
//!
//! # Examples
//!
//! ```no_run
//! use linman::config::InventoryConfig;
//! use linman::inventory::Aggregator;
//!
//! let mut aggregator = Aggregator::system(InventoryConfig::default());
//! let snapshot = aggregator.refresh();
//! for entry in snapshot.entries.values().filter(|e| !e.is_hidden) {
//!     println!("[{}] {} ({})", entry.category, entry.name, entry.driver);
//! }
//! ```

pub mod classify;
mod entry;
mod passes;
pub mod walk;

pub use entry::{Category, DeviceEntry, DriverBinding};
pub use walk::{resolve_driver, walk_up, WalkOutcome};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::InventoryConfig;
use crate::exec::{CommandRunner, SystemRunner};
use crate::ids::IdResolver;
use crate::source::{DeviceSource, SysfsSource};

/// Result of one refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Monotonic refresh counter of the producing aggregator
    pub generation: u64,
    pub captured_at: DateTime<Utc>,
    /// Entries keyed by device path
    pub entries: BTreeMap<String, DeviceEntry>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, device_path: &str) -> Option<&DeviceEntry> {
        self.entries.get(device_path)
    }

    /// Entries of one category, in key order.
    pub fn by_category(&self, category: Category) -> Vec<&DeviceEntry> {
        self.entries
            .values()
            .filter(|e| e.category == category)
            .collect()
    }

    pub fn hidden_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_hidden).count()
    }

    pub fn missing_driver_count(&self) -> usize {
        self.entries.values().filter(|e| e.driver_missing).count()
    }
}

/// Builds snapshots from a device source.
///
/// Owns everything a refresh needs; there is no global state. Callers that
/// refresh from several threads must serialize through
/// [`RefreshCoordinator`](crate::refresh::RefreshCoordinator).
pub struct Aggregator {
    config: InventoryConfig,
    source: Arc<dyn DeviceSource>,
    resolver: IdResolver,
    runner: Arc<dyn CommandRunner>,
    generation: u64,
}

impl Aggregator {
    pub fn new(
        config: InventoryConfig,
        source: Arc<dyn DeviceSource>,
        resolver: IdResolver,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            source,
            resolver,
            runner,
            generation: 0,
        }
    }

    /// Aggregator over the live system: sysfs, udev database and real tools.
    pub fn system(config: InventoryConfig) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
        let source = Arc::new(SysfsSource::new(&config.sysfs_root, &config.udev_data_dir));
        let resolver = IdResolver::new(&config, runner.clone());
        Self::new(config, source, resolver, runner)
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Re-enumerate everything and build a fresh snapshot.
    ///
    /// Never fails: unavailable sources only make labels less specific.
    pub fn refresh(&mut self) -> Snapshot {
        self.generation += 1;
        let entries = passes::Build::new(
            &self.config,
            self.source.as_ref(),
            &self.resolver,
            self.runner.as_ref(),
        )
        .run();

        let snapshot = Snapshot {
            generation: self.generation,
            captured_at: Utc::now(),
            entries,
        };
        log::info!(
            "Refresh #{}: {} devices ({} hidden, {} without driver)",
            snapshot.generation,
            snapshot.len(),
            snapshot.hidden_count(),
            snapshot.missing_driver_count()
        );
        snapshot
    }
}
