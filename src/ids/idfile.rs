// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Flat `pci.ids` / `usb.ids` parser
//!
//! Format:
//!
//! ```text
//! # comment
//! 8086  Intel Corporation
//! <TAB>15bc  Ethernet Connection (7) I219-V
//! <TAB><TAB>8086 0000  subsystem line (ignored)
//! C 02  Network controller          (class section, ignored)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
struct VendorRecord {
    name: String,
    devices: HashMap<String, String>,
}

/// Parsed ID file, keyed by lower-case hex
#[derive(Debug, Clone, Default)]
pub struct IdDatabase {
    vendors: HashMap<String, VendorRecord>,
    source: Option<PathBuf>,
}

impl IdDatabase {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the first readable file from `candidates`. Missing files yield
    /// an empty database.
    pub fn load_first<P: AsRef<Path>>(candidates: &[P]) -> Self {
        for path in candidates {
            let path = path.as_ref();
            match std::fs::read(path) {
                Ok(bytes) => {
                    let mut db = Self::parse(&bytes);
                    log::debug!("Loaded {} vendors from {}", db.vendors.len(), path.display());
                    db.source = Some(path.to_path_buf());
                    return db;
                }
                Err(e) => log::trace!("{} not readable: {}", path.display(), e),
            }
        }
        Self::empty()
    }

    /// Parse raw file content. Lines that are not valid UTF-8 or carry a
    /// malformed ID are skipped one by one.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut vendors: HashMap<String, VendorRecord> = HashMap::new();
        let mut current: Option<String> = None;

        for raw in bytes.split(|b| *b == b'\n') {
            let Ok(line) = std::str::from_utf8(raw) else {
                continue;
            };
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('\t') {
                // Sub-device lines are double-indented.
                if rest.starts_with('\t') {
                    continue;
                }
                let Some(vendor) = current.as_ref() else {
                    continue;
                };
                if let Some((id, name)) = split_id_line(rest) {
                    if let Some(record) = vendors.get_mut(vendor) {
                        record.devices.insert(id, name);
                    }
                }
                continue;
            }

            // Unindented: either a vendor line or the start of another
            // section (`C 02 ...` classes, usb.ids `HID`, `L`, ...).
            match split_id_line(line) {
                Some((id, name)) => {
                    vendors.entry(id.clone()).or_default().name = name;
                    current = Some(id);
                }
                None => current = None,
            }
        }

        Self {
            vendors,
            source: None,
        }
    }

    pub fn vendor(&self, vendor_id: &str) -> Option<&str> {
        self.vendors
            .get(vendor_id)
            .map(|v| v.name.as_str())
            .filter(|n| !n.is_empty())
    }

    pub fn device(&self, vendor_id: &str, device_id: &str) -> Option<&str> {
        self.vendors
            .get(vendor_id)?
            .devices
            .get(device_id)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }

    /// File this database was loaded from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Split `"15bc  Name"` into a normalized 4-digit hex ID and a name.
fn split_id_line(line: &str) -> Option<(String, String)> {
    let (id, name) = line.split_once(char::is_whitespace)?;
    if id.len() != 4 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((id.to_ascii_lowercase(), name.to_string()))
}
