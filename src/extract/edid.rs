// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! EDID monitor-name descriptor

/// Minimum size of a base EDID block
pub const EDID_BLOCK_LEN: usize = 128;

/// Offsets of the four 18-byte display descriptors in the base block
const DESCRIPTOR_OFFSETS: [usize; 4] = [54, 72, 90, 108];

/// Tag bytes of a display product name descriptor
const NAME_TAG: [u8; 5] = [0x00, 0x00, 0x00, 0xFC, 0x00];

const NAME_LEN: usize = 13;

/// Monitor name from a raw EDID blob.
///
/// Returns `None` for short buffers, when no descriptor slot carries the
/// product-name tag, or when the name is blank.
pub fn monitor_name(edid: &[u8]) -> Option<String> {
    if edid.len() < EDID_BLOCK_LEN {
        return None;
    }
    DESCRIPTOR_OFFSETS.iter().find_map(|&offset| {
        let slot = &edid[offset..offset + 18];
        if slot[..5] != NAME_TAG {
            return None;
        }
        let raw = &slot[5..5 + NAME_LEN];
        let end = raw.iter().position(|&b| b == 0x0A).unwrap_or(raw.len());
        // Latin-1: every byte maps to the code point of the same value.
        let name: String = raw[..end].iter().map(|&b| b as char).collect();
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}
