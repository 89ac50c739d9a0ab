// SPDX-License-Identifier: AGPL-3.0-or-later
//! Benchmark for a full inventory refresh.
//!
//! Builds a simulated machine with a few hundred kernel objects (PCI
//! functions with net/drm/tty children, USB devices with interfaces, input
//! nodes) and measures one complete aggregation pass over it.

use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use linman::exec::NoToolsRunner;
use linman::ids::IdDatabase;
use linman::{Aggregator, IdResolver, InventoryConfig, RawDevice, SimulatedSource};

fn kernel(subsystem: &str, path: &str) -> RawDevice {
    let name = path.rsplit('/').next().unwrap_or(path);
    RawDevice::kernel(subsystem, name, format!("/sys{}", path), path)
}

fn machine() -> SimulatedSource {
    let source = SimulatedSource::new();
    for bus in 0..8u32 {
        for func in 0..8u32 {
            let path = format!("/devices/pci0000:00/0000:{:02x}:00.{}", bus, func);
            let class = ["0x020000", "0x030000", "0x070002", "0x010802"][(func % 4) as usize];
            source.insert(kernel("pci", &path).with_property("DRIVER", "bench"));
            source.set_attribute(&path, "class", class);
            source.set_attribute(&path, "vendor", "0x8086");
            source.set_attribute(&path, "device", format!("0x{:04x}", bus * 8 + func));
            let (sub, node) = match func % 4 {
                0 => ("net", format!("eth{}{}", bus, func)),
                1 => ("drm", format!("card{}", bus * 8 + func)),
                2 => ("tty", format!("ttyS{}", bus * 8 + func)),
                _ => ("block", format!("nvme{}n1", bus * 8 + func)),
            };
            let mut dev = kernel(sub, &format!("{}/{}/{}", path, sub, node)).with_parent(&path);
            if sub == "block" {
                dev = dev.with_property("DEVTYPE", "disk");
            }
            source.insert(dev);
        }
    }

    let hub = "/devices/pci0000:00/0000:00:14.0/usb1";
    for port in 1..=32u32 {
        let path = format!("{}/1-{}", hub, port);
        source.insert(
            kernel("usb", &path)
                .with_parent(hub)
                .with_property("DEVTYPE", "usb_device")
                .with_property("DRIVER", "usb")
                .with_property("ID_VENDOR_ID", "046d")
                .with_property("ID_MODEL_ID", format!("{:04x}", 0xc500 + port)),
        );
        let iface = format!("{}/1-{}:1.0", path, port);
        source.insert(
            kernel("usb", &iface)
                .with_parent(&path)
                .with_property("DEVTYPE", "usb_interface")
                .with_property("DRIVER", "usbhid"),
        );
        let input = format!("{}/input/input{}", iface, port);
        source.insert(kernel("input", &input).with_parent(&iface).with_property("NAME", "Bench Mouse"));
        source.insert(
            kernel("input", &format!("{}/event{}", input, port))
                .with_parent(&input)
                .with_property("ID_INPUT_MOUSE", "1"),
        );
    }

    for i in 0..16 {
        source.insert(kernel("net", &format!("/devices/virtual/net/veth{}", i)));
    }
    source
}

fn bench_refresh(c: &mut Criterion) {
    let mut config = InventoryConfig::default();
    config.procfs_root = "/nonexistent".into();
    config.tools.use_dmidecode = false;

    let ids = IdDatabase::parse(b"8086  Intel Corporation\n\t0000  Bench Device\n046d  Logitech, Inc.\n");
    let resolver = IdResolver::from_parts(None, ids, IdDatabase::empty(), None);
    let mut aggregator = Aggregator::new(config, Arc::new(machine()), resolver, Arc::new(NoToolsRunner));

    c.bench_function("refresh_simulated_machine", |b| {
        b.iter(|| aggregator.refresh());
    });
}

criterion_group!(benches, bench_refresh);
criterion_main!(benches);
