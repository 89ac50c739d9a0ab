// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Live enumeration from sysfs and the udev runtime database.
//!
//! Each device directory carries a `uevent` file with the kernel's own
//! properties (`DRIVER`, `PCI_CLASS`, `DEVTYPE`, ...). udev stores the
//! properties it adds (`ID_VENDOR_FROM_DATABASE`, `ID_INPUT_KEYBOARD`, ...)
//! under `/run/udev/data/<key>` as `E:KEY=VALUE` lines, where the key is
//! `b<maj>:<min>` / `c<maj>:<min>` for device nodes, `n<ifindex>` for
//! network interfaces and `+<subsystem>:<sysname>` otherwise.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::DeviceSource;
use crate::device::RawDevice;

/// Device source backed by a sysfs mount
#[derive(Debug, Clone)]
pub struct SysfsSource {
    root: PathBuf,
    udev_data_dir: PathBuf,
}

impl SysfsSource {
    pub fn new(sysfs_root: impl Into<PathBuf>, udev_data_dir: impl Into<PathBuf>) -> Self {
        let root = sysfs_root.into();
        // Class links resolve to canonical paths, so the root must be
        // canonical too for prefix stripping to work.
        let root = fs::canonicalize(&root).unwrap_or(root);
        Self {
            root,
            udev_data_dir: udev_data_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories listing the members of a subsystem: buses keep theirs
    /// under `bus/<name>/devices`, classes under `class/<name>`.
    fn listing_dirs(&self, subsystem: &str) -> [PathBuf; 2] {
        [
            self.root.join("bus").join(subsystem).join("devices"),
            self.root.join("class").join(subsystem),
        ]
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(format!("/{}", rel.to_string_lossy()))
    }

    /// Build a device from its canonical sysfs directory.
    fn load(&self, dir: &Path, fallback_subsystem: &str) -> Option<RawDevice> {
        let uevent = fs::read_to_string(dir.join("uevent")).ok()?;
        let device_path = self.relative(dir)?;
        let sys_name = dir.file_name()?.to_string_lossy().into_owned();
        let subsystem = link_name(&dir.join("subsystem"))
            .unwrap_or_else(|| fallback_subsystem.to_string());

        let mut device = RawDevice::kernel(
            subsystem.clone(),
            sys_name.clone(),
            dir.to_string_lossy().into_owned(),
            device_path,
        );

        let mut props = parse_uevent(&uevent);
        if !props.contains_key("DRIVER") {
            if let Some(driver) = link_name(&dir.join("driver")) {
                props.insert("DRIVER".into(), driver);
            }
        }
        for (key, value) in self.udev_properties(&subsystem, &sys_name, &props) {
            props.entry(key).or_insert(value);
        }
        for (key, value) in props {
            device.set_property(key, value);
        }

        if let Some(parent) = self.parent_dir(dir).and_then(|p| self.relative(&p)) {
            device = device.with_parent(parent);
        }
        Some(device)
    }

    /// Nearest ancestor directory that is itself a device.
    fn parent_dir(&self, dir: &Path) -> Option<PathBuf> {
        let devices = self.root.join("devices");
        let mut current = dir.parent();
        while let Some(candidate) = current {
            if !candidate.starts_with(&devices) || candidate == devices {
                return None;
            }
            if candidate.join("uevent").is_file() {
                return Some(candidate.to_path_buf());
            }
            current = candidate.parent();
        }
        None
    }

    fn udev_properties(
        &self,
        subsystem: &str,
        sys_name: &str,
        props: &BTreeMap<String, String>,
    ) -> Vec<(String, String)> {
        let key = udev_db_key(subsystem, sys_name, props);
        match fs::read_to_string(self.udev_data_dir.join(&key)) {
            Ok(content) => parse_udev_db(&content),
            Err(e) => {
                log::trace!("No udev record {}: {}", key, e);
                Vec::new()
            }
        }
    }
}

impl Default for SysfsSource {
    fn default() -> Self {
        Self::new("/sys", "/run/udev/data")
    }
}

impl DeviceSource for SysfsSource {
    fn enumerate(&self, subsystem: &str) -> Vec<RawDevice> {
        let mut seen = BTreeMap::new();
        for listing in self.listing_dirs(subsystem) {
            let Ok(entries) = fs::read_dir(&listing) else {
                continue;
            };
            for entry in entries.flatten() {
                let Ok(dir) = fs::canonicalize(entry.path()) else {
                    continue;
                };
                if let Some(device) = self.load(&dir, subsystem) {
                    seen.entry(device.device_path().to_string()).or_insert(device);
                }
            }
        }
        seen.into_values().collect()
    }

    fn device(&self, device_path: &str) -> Option<RawDevice> {
        let dir = self.root.join(device_path.trim_start_matches('/'));
        let fallback = link_name(&dir.join("subsystem")).unwrap_or_default();
        self.load(&dir, &fallback)
    }

    fn attribute_bytes(&self, device: &RawDevice, name: &str) -> Option<Vec<u8>> {
        fs::read(Path::new(device.sys_path()).join(name)).ok()
    }

    fn has_attribute(&self, device: &RawDevice, name: &str) -> bool {
        Path::new(device.sys_path()).join(name).exists()
    }
}

/// Final component of a symlink target (`driver` -> `.../drivers/e1000e`).
fn link_name(link: &Path) -> Option<String> {
    let target = fs::read_link(link).ok()?;
    target.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Parse `KEY=VALUE` lines of a `uevent` file.
pub(crate) fn parse_uevent(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Extract `E:KEY=VALUE` property lines from a udev database record.
pub(crate) fn parse_udev_db(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| line.strip_prefix("E:"))
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// File name of a device's record in the udev database.
pub(crate) fn udev_db_key(
    subsystem: &str,
    sys_name: &str,
    props: &BTreeMap<String, String>,
) -> String {
    if let (Some(major), Some(minor)) = (props.get("MAJOR"), props.get("MINOR")) {
        let kind = if subsystem == "block" { 'b' } else { 'c' };
        return format!("{}{}:{}", kind, major, minor);
    }
    if subsystem == "net" {
        if let Some(ifindex) = props.get("IFINDEX") {
            return format!("n{}", ifindex);
        }
    }
    format!("+{}:{}", subsystem, sys_name)
}
