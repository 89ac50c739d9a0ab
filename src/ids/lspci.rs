// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Per-slot `lspci -mm -s <slot>` lookups with an LRU cache

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::IdLookupResult;
use crate::exec::{run_text, CommandRunner};

/// Live slot query adapter. Results (including misses) are cached for the
/// lifetime of the process.
pub struct SlotLookup {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    cache: Mutex<LruCache<String, IdLookupResult>>,
}

impl SlotLookup {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            runner,
            timeout,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn lookup(&self, slot: &str) -> IdLookupResult {
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(slot)
        {
            return hit.clone();
        }

        let result = run_text(self.runner.as_ref(), "lspci", &["-mm", "-s", slot], self.timeout)
            .map(|out| parse_machine_output(&out))
            .unwrap_or_default();

        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(slot.to_string(), result.clone());
        result
    }

    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Parse the first record of `lspci -mm` output:
/// `00:1f.6 "Ethernet controller" "Intel Corporation" "I219-V" -r10 ...`
fn parse_machine_output(out: &str) -> IdLookupResult {
    let Some(line) = out.lines().find(|l| !l.trim().is_empty()) else {
        return IdLookupResult::default();
    };
    let fields = quoted_fields(line);
    // fields: class, vendor, device, [subsystem vendor, subsystem device]
    let pick = |i: usize| {
        fields
            .get(i)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    IdLookupResult {
        vendor: pick(1),
        device: pick(2),
    }
}

fn quoted_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut inside = false;
    for c in line.chars() {
        match (c, inside) {
            ('"', false) => inside = true,
            ('"', true) => {
                fields.push(std::mem::take(&mut current));
                inside = false;
            }
            (c, true) => current.push(c),
            _ => {}
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CommandOutput, ScriptedRunner};

    const LINE: &str = "00:1f.6 \"Ethernet controller\" \"Intel Corporation\" \"Ethernet Connection (7) I219-V\" -r10 \"Intel Corporation\" \"Device 0000\"\n";

    #[test]
    fn test_parse_machine_output() {
        let r = parse_machine_output(LINE);
        assert_eq!(r.vendor.as_deref(), Some("Intel Corporation"));
        assert_eq!(r.device.as_deref(), Some("Ethernet Connection (7) I219-V"));
    }

    #[test]
    fn test_parse_garbage_is_absent() {
        assert_eq!(parse_machine_output(""), IdLookupResult::default());
        assert_eq!(parse_machine_output("no quotes here"), IdLookupResult::default());
    }

    #[test]
    fn test_lookup_is_cached_per_slot() {
        let runner = Arc::new(ScriptedRunner::new().with(
            "lspci",
            &["-mm", "-s", "0000:00:1f.6"],
            CommandOutput::ok(LINE),
        ));
        let lookup = SlotLookup::new(runner.clone(), Duration::from_secs(1), 8);
        let first = lookup.lookup("0000:00:1f.6");
        let second = lookup.lookup("0000:00:1f.6");
        assert_eq!(first, second);
        assert_eq!(runner.calls().len(), 1);

        // Misses are cached too.
        lookup.lookup("0000:03:00.0");
        lookup.lookup("0000:03:00.0");
        assert_eq!(runner.calls().len(), 2);
        assert_eq!(lookup.cached(), 2);
    }

    #[test]
    fn test_cache_is_bounded() {
        let lookup = SlotLookup::new(Arc::new(ScriptedRunner::new()), Duration::from_secs(1), 2);
        for slot in ["a", "b", "c"] {
            lookup.lookup(slot);
        }
        assert_eq!(lookup.cached(), 2);
    }
}
