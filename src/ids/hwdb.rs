// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! systemd hardware database lookups via `systemd-hwdb query`

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::IdLookupResult;
use crate::exec::{run_text, CommandRunner};

const HWDB: &str = "systemd-hwdb";

/// Hardware database adapter. Answers, misses included, are cached per
/// modalias since the database does not change under a running process.
pub struct Hwdb {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    cache: Mutex<LruCache<String, IdLookupResult>>,
}

impl Hwdb {
    /// Probe for the tool once; `None` when it is not installed.
    pub fn probe(runner: Arc<dyn CommandRunner>, timeout: Duration, capacity: usize) -> Option<Self> {
        if !runner.available(HWDB) {
            log::debug!("{} not available, skipping hardware database", HWDB);
            return None;
        }
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Some(Self {
            runner,
            timeout,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn lookup(&self, subsystem: &str, vendor_id: &str, device_id: &str) -> IdLookupResult {
        let Some(modalias) = modalias(subsystem, vendor_id, device_id) else {
            return IdLookupResult::default();
        };
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&modalias)
        {
            return hit.clone();
        }

        let result = run_text(self.runner.as_ref(), HWDB, &["query", &modalias], self.timeout)
            .map(|out| parse_query(&out))
            .unwrap_or_default();

        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(modalias, result.clone());
        result
    }
}

/// Modalias string used as the hwdb match key.
fn modalias(subsystem: &str, vendor_id: &str, device_id: &str) -> Option<String> {
    let vendor = u32::from_str_radix(vendor_id, 16).ok()?;
    let device = u32::from_str_radix(device_id, 16).ok()?;
    match subsystem {
        "pci" => Some(format!("pci:v{:08X}d{:08X}", vendor, device)),
        "usb" => Some(format!("usb:v{:04X}p{:04X}", vendor, device)),
        _ => None,
    }
}

fn parse_query(out: &str) -> IdLookupResult {
    let mut result = IdLookupResult::default();
    for line in out.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "ID_VENDOR_FROM_DATABASE" => result.vendor = Some(value.to_string()),
            "ID_MODEL_FROM_DATABASE" => result.device = Some(value.to_string()),
            _ => {}
        }
    }
    result
}
