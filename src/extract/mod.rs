// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Narrow readers for binary blobs, tool output and pseudo-files.
//!
//! Each extractor answers with an absent value (or an empty list) when its
//! input is missing or malformed; none of them returns an error.

pub mod dmi;
pub mod edid;
pub mod procfs;
pub mod sysfs;

pub use dmi::{memory_modules, parse_memory_devices, MemoryModule};
pub use edid::monitor_name;
pub use procfs::{parse_cpuinfo, read_cpuinfo, read_mem_total_kib, CpuRecord};
pub use sysfs::{
    block_size_bytes, connector_status, pci_class_byte, tty_has_resource, ConnectorStatus,
};
