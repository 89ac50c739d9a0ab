// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! # LinMan
//!
//! A live, de-duplicated inventory of the hardware attached to a Linux
//! machine, grouped into a fixed set of categories.
//!
//! The kernel exposes one physical device as many objects: a network card
//! is a PCI function, a `net` interface and sometimes a DRM or sound node.
//! LinMan reads sysfs and the udev database, walks each logical object up
//! to the physical device backing it, and produces exactly one
//! [`DeviceEntry`] per physical device with a human-readable name resolved
//! from the hardware database, `pci.ids`/`usb.ids` or `lspci`. Processors
//! and memory modules are synthesized from `/proc/cpuinfo` and DMI tables.
//!
//! ## Modules
//!
//! - [`source`]: device enumeration (`sysfs` + udev database, or simulated)
//! - [`ids`]: vendor/model name resolution chain
//! - [`extract`]: EDID, DMI, procfs and sysfs attribute readers
//! - [`inventory`]: classification, parent walking and the [`Aggregator`]
//! - [`refresh`]: single-flight refresh coordination
//! - [`hotplug`]: netlink uevent watcher with burst debouncing
//! - [`actions`]: privileged unbind/rebind and module unload/reload
//! - [`view`]: hidden-entry filtering and category grouping
//!
//! ## Example
//!
//! ```no_run
//! use linman::{view, Aggregator, InventoryConfig};
//!
//! let config = InventoryConfig::default();
//! let mut aggregator = Aggregator::system(config);
//! let snapshot = aggregator.refresh();
//! for (category, entries) in view::group_by_category(&snapshot, false) {
//!     println!("{}", category);
//!     for entry in entries {
//!         println!("  {}", entry.name);
//!     }
//! }
//! ```

pub mod actions;
pub mod config;
pub mod device;
pub mod error;
pub mod exec;
pub mod extract;
pub mod hotplug;
pub mod ids;
pub mod inventory;
pub mod refresh;
pub mod source;
pub mod view;

pub use actions::{ActionError, ActionKind, ActionRequest, ActionRunner};
pub use config::InventoryConfig;
pub use device::{DeviceOrigin, RawDevice};
pub use error::{InventoryError, Result};
pub use exec::{CommandRunner, SystemRunner};
pub use hotplug::{HotplugWatcher, NetlinkUeventSocket};
pub use ids::{IdLookupResult, IdResolver};
pub use inventory::{Aggregator, Category, DeviceEntry, DriverBinding, Snapshot};
pub use refresh::{RefreshCoordinator, RefreshOutcome, SnapshotSink};
pub use source::{DeviceSource, SimulatedSource, SysfsSource};
