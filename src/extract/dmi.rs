// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! SMBIOS type 17 (Memory Device) records from `dmidecode -t 17`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::exec::{run_text, CommandRunner};

/// One installed memory module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryModule {
    /// Slot label (e.g., "DIMM_A1", "ChannelA-DIMM0")
    pub locator: String,
    pub bank_locator: Option<String>,
    /// Size as reported (e.g., "16 GB")
    pub size: String,
    /// Memory type (e.g., "DDR4")
    pub memory_type: Option<String>,
    /// Speed as reported (e.g., "3200 MT/s")
    pub speed: Option<String>,
    pub manufacturer: Option<String>,
    pub part_number: Option<String>,
}

impl MemoryModule {
    /// Display name, e.g. `16 GB DDR4 (DIMM_A1)`.
    pub fn label(&self) -> String {
        let mut name = self.size.clone();
        if let Some(kind) = &self.memory_type {
            name.push(' ');
            name.push_str(kind);
        }
        if !self.locator.is_empty() {
            name.push_str(&format!(" ({})", self.locator));
        }
        name
    }
}

/// Run `dmidecode -t 17` and parse it. Any failure (missing tool, no
/// privileges, timeout) yields an empty list.
pub fn memory_modules(runner: &dyn CommandRunner, timeout: Duration) -> Vec<MemoryModule> {
    run_text(runner, "dmidecode", &["-t", "17"], timeout)
        .map(|out| parse_memory_devices(&out))
        .unwrap_or_default()
}

/// Parse `dmidecode -t 17` text output.
pub fn parse_memory_devices(text: &str) -> Vec<MemoryModule> {
    let mut modules = Vec::new();
    let mut in_device = false;
    let mut fields: HashMap<String, String> = HashMap::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed == "Memory Device" {
            if in_device {
                modules.extend(module_from_fields(&fields));
            }
            in_device = true;
            fields.clear();
            continue;
        }

        // A new handle ends the current record.
        if trimmed.starts_with("Handle ") {
            if in_device {
                modules.extend(module_from_fields(&fields));
            }
            in_device = false;
            fields.clear();
            continue;
        }

        if in_device {
            if let Some((key, val)) = trimmed.split_once(':') {
                fields.insert(key.trim().to_string(), val.trim().to_string());
            }
        }
    }

    if in_device {
        modules.extend(module_from_fields(&fields));
    }

    modules
}

fn module_from_fields(fields: &HashMap<String, String>) -> Option<MemoryModule> {
    let size = fields.get("Size").cloned().unwrap_or_default();
    let populated = !size.is_empty()
        && !size.contains("No Module Installed")
        && !size.eq_ignore_ascii_case("Unknown")
        && !size.eq_ignore_ascii_case("Not Installed");
    if !populated {
        return None;
    }

    let meaningful = |key: &str| {
        fields
            .get(key)
            .filter(|v| !v.is_empty() && !is_placeholder(v))
            .cloned()
    };

    Some(MemoryModule {
        locator: fields.get("Locator").cloned().unwrap_or_default(),
        bank_locator: meaningful("Bank Locator"),
        size,
        memory_type: meaningful("Type"),
        speed: meaningful("Speed"),
        manufacturer: meaningful("Manufacturer"),
        part_number: meaningful("Part Number"),
    })
}

/// Filler values firmware puts in unused string fields.
fn is_placeholder(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "unknown" | "not specified" | "none" | "undefined" | "n/a"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CommandOutput, ScriptedRunner};

    const DUMP: &str = "\
# dmidecode 3.5
Getting SMBIOS data from sysfs.
SMBIOS 3.3.0 present.

Handle 0x0040, DMI type 17, 92 bytes
Memory Device
\tArray Handle: 0x003F
\tSize: 16 GB
\tLocator: DIMM_A1
\tBank Locator: BANK 0
\tType: DDR4
\tSpeed: 3200 MT/s
\tManufacturer: Samsung
\tPart Number: M378A2K43CB1-CTD

Handle 0x0041, DMI type 17, 92 bytes
Memory Device
\tSize: No Module Installed
\tLocator: DIMM_A2
\tType: Unknown

Handle 0x0042, DMI type 17, 92 bytes
Memory Device
\tSize: 16 GB
\tLocator: DIMM_B1
\tType: DDR4
\tManufacturer: Unknown
";

    #[test]
    fn test_parse_skips_empty_slots() {
        let modules = parse_memory_devices(DUMP);
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].locator, "DIMM_A1");
        assert_eq!(modules[0].manufacturer.as_deref(), Some("Samsung"));
        assert_eq!(modules[0].label(), "16 GB DDR4 (DIMM_A1)");
        assert_eq!(modules[1].locator, "DIMM_B1");
        assert!(modules[1].manufacturer.is_none());
    }

    #[test]
    fn test_parse_no_records() {
        assert!(parse_memory_devices("").is_empty());
        assert!(parse_memory_devices("# No SMBIOS nor DMI entry point found, sorry.\n").is_empty());
    }

    #[test]
    fn test_tool_failure_is_empty() {
        let denied = ScriptedRunner::new().with("dmidecode", &["-t", "17"], CommandOutput::failed(1));
        assert!(memory_modules(&denied, Duration::from_secs(1)).is_empty());
        assert!(memory_modules(&ScriptedRunner::new(), Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_tool_success() {
        let runner = ScriptedRunner::new().with("dmidecode", &["-t", "17"], CommandOutput::ok(DUMP));
        assert_eq!(memory_modules(&runner, Duration::from_secs(1)).len(), 2);
    }
}
