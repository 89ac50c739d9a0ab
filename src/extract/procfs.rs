// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! `/proc/cpuinfo` and `/proc/meminfo` readers

use std::path::Path;

/// One logical CPU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuRecord {
    /// `processor` index
    pub index: u32,
    pub vendor: Option<String>,
    pub model: Option<String>,
}

/// Read and parse `<procfs>/cpuinfo`; unreadable file yields no records.
pub fn read_cpuinfo(procfs_root: &Path) -> Vec<CpuRecord> {
    match std::fs::read_to_string(procfs_root.join("cpuinfo")) {
        Ok(text) => parse_cpuinfo(&text),
        Err(e) => {
            log::debug!("cpuinfo unavailable: {}", e);
            Vec::new()
        }
    }
}

/// One record per `processor` block. Vendor and model are shared by all
/// CPUs, so the first block that names them supplies them for every record.
pub fn parse_cpuinfo(text: &str) -> Vec<CpuRecord> {
    let mut indices = Vec::new();
    let mut vendor = None;
    let mut model = None;

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "processor" => {
                if let Ok(index) = value.parse::<u32>() {
                    indices.push(index);
                }
            }
            "vendor_id" if vendor.is_none() && !value.is_empty() => {
                vendor = Some(cpu_vendor_name(value));
            }
            // x86 uses "model name"; some arm64 kernels report "Processor"
            // or only "CPU implementer".
            "model name" | "Processor" | "cpu model" if model.is_none() && !value.is_empty() => {
                model = Some(value.to_string());
            }
            "CPU implementer" if vendor.is_none() => {
                vendor = arm_implementer(value).map(str::to_string);
            }
            _ => {}
        }
    }

    indices
        .into_iter()
        .map(|index| CpuRecord {
            index,
            vendor: vendor.clone(),
            model: model.clone(),
        })
        .collect()
}

fn cpu_vendor_name(vendor_id: &str) -> String {
    match vendor_id {
        "GenuineIntel" => "Intel".to_string(),
        "AuthenticAMD" => "AMD".to_string(),
        "CentaurHauls" => "Centaur".to_string(),
        "HygonGenuine" => "Hygon".to_string(),
        other => other.to_string(),
    }
}

fn arm_implementer(code: &str) -> Option<&'static str> {
    match code.trim().to_ascii_lowercase().as_str() {
        "0x41" => Some("ARM"),
        "0x42" => Some("Broadcom"),
        "0x43" => Some("Cavium"),
        "0x48" => Some("HiSilicon"),
        "0x4e" => Some("NVIDIA"),
        "0x51" => Some("Qualcomm"),
        "0x61" => Some("Apple"),
        _ => None,
    }
}

/// `MemTotal` in KiB from `<procfs>/meminfo`.
pub fn read_mem_total_kib(procfs_root: &Path) -> Option<u64> {
    let text = std::fs::read_to_string(procfs_root.join("meminfo")).ok()?;
    parse_mem_total_kib(&text)
}

pub fn parse_mem_total_kib(text: &str) -> Option<u64> {
    text.lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

/// Human readable size for a KiB count, e.g. `15.5 GiB`.
pub fn format_kib(kib: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    let mut value = kib as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPUINFO: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-10700 CPU @ 2.90GHz

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-10700 CPU @ 2.90GHz
";

    #[test]
    fn test_parse_cpuinfo() {
        let cpus = parse_cpuinfo(CPUINFO);
        assert_eq!(cpus.len(), 2);
        assert_eq!(cpus[1].index, 1);
        assert_eq!(cpus[0].vendor.as_deref(), Some("Intel"));
        assert_eq!(
            cpus[1].model.as_deref(),
            Some("Intel(R) Core(TM) i7-10700 CPU @ 2.90GHz")
        );
    }

    #[test]
    fn test_parse_cpuinfo_arm() {
        let text = "processor\t: 0\nCPU implementer\t: 0x41\n\nprocessor\t: 1\nCPU implementer\t: 0x41\n";
        let cpus = parse_cpuinfo(text);
        assert_eq!(cpus.len(), 2);
        assert_eq!(cpus[0].vendor.as_deref(), Some("ARM"));
        assert!(cpus[0].model.is_none());
    }

    #[test]
    fn test_mem_total() {
        let text = "MemTotal:       16302412 kB\nMemFree:         1234 kB\n";
        assert_eq!(parse_mem_total_kib(text), Some(16302412));
        assert_eq!(parse_mem_total_kib("MemFree: 1 kB\n"), None);
    }

    #[test]
    fn test_format_kib() {
        assert_eq!(format_kib(16302412), "15.5 GiB");
        assert_eq!(format_kib(512), "512.0 KiB");
    }

    #[test]
    fn test_readers_on_fixture_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cpuinfo"), CPUINFO).unwrap();
        std::fs::write(dir.path().join("meminfo"), "MemTotal: 8192 kB\n").unwrap();
        assert_eq!(read_cpuinfo(dir.path()).len(), 2);
        assert_eq!(read_mem_total_kib(dir.path()), Some(8192));

        let empty = tempfile::tempdir().unwrap();
        assert!(read_cpuinfo(empty.path()).is_empty());
        assert!(read_mem_total_kib(empty.path()).is_none());
    }
}
