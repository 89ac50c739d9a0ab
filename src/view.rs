// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Presentation helpers over a [`Snapshot`]

use std::collections::BTreeMap;

use crate::inventory::{Category, DeviceEntry, Snapshot};

/// Entries to display. Hidden entries stay in the snapshot and are only
/// filtered here.
pub fn visible(snapshot: &Snapshot, show_hidden: bool) -> impl Iterator<Item = &DeviceEntry> {
    snapshot
        .entries
        .values()
        .filter(move |e| show_hidden || !e.is_hidden)
}

/// Visible entries grouped by category, categories in label order and
/// entries sorted by name within each.
pub fn group_by_category(
    snapshot: &Snapshot,
    show_hidden: bool,
) -> BTreeMap<Category, Vec<&DeviceEntry>> {
    let mut groups: BTreeMap<Category, Vec<&DeviceEntry>> = BTreeMap::new();
    for entry in visible(snapshot, show_hidden) {
        groups.entry(entry.category).or_default().push(entry);
    }
    for entries in groups.values_mut() {
        entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.device_path.cmp(&b.device_path)));
    }
    groups
}
