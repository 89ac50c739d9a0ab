// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Kernel uevent message parsing
//!
//! A kernel uevent datagram is a header `ACTION@DEVPATH` followed by
//! NUL-separated `KEY=VALUE` pairs:
//!
//! ```text
//! add@/devices/pci0000:00/0000:00:14.0/usb1/1-2\0ACTION=add\0SUBSYSTEM=usb\0...
//! ```

use std::collections::BTreeMap;

use crate::error::{InventoryError, Result};

/// Prefix of messages re-broadcast by udevd (group 2); not kernel format.
const LIBUDEV_MAGIC: &[u8] = b"libudev\0";

/// One parsed hot-plug event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uevent {
    pub action: String,
    pub devpath: String,
    pub subsystem: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl Uevent {
    pub fn parse(message: &[u8]) -> Result<Self> {
        if message.starts_with(LIBUDEV_MAGIC) {
            return Err(InventoryError::Parse("udev-format uevent".into()));
        }
        let mut fields = message
            .split(|b| *b == 0)
            .filter(|f| !f.is_empty())
            .map(|f| String::from_utf8_lossy(f).into_owned());

        let header = fields
            .next()
            .ok_or_else(|| InventoryError::Parse("empty uevent".into()))?;
        let (action, devpath) = header
            .split_once('@')
            .filter(|(a, p)| !a.is_empty() && p.starts_with('/'))
            .ok_or_else(|| InventoryError::Parse(format!("bad uevent header: {:?}", header)))?;

        let properties: BTreeMap<String, String> = fields
            .filter_map(|f| f.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
            .collect();

        Ok(Self {
            action: action.to_string(),
            devpath: devpath.to_string(),
            subsystem: properties.get("SUBSYSTEM").cloned(),
            properties,
        })
    }

    /// Whether this event's subsystem is in `allow`.
    pub fn matches(&self, allow: &[String]) -> bool {
        self.subsystem
            .as_deref()
            .is_some_and(|s| allow.iter().any(|a| a == s))
    }
}
