// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Hot-plug watcher
//!
//! Listens for kernel uevents on an allow-listed set of subsystems and asks
//! for one refresh per burst of events. A USB device that enumerates a
//! dozen child nodes produces a single refresh, fired a fixed delay after
//! the first event of the burst.
//!
//! # Examples
//!
//! ```no_run
//! use linman::config::InventoryConfig;
//! use linman::hotplug::{HotplugWatcher, NetlinkUeventSocket};
//!
//! let config = InventoryConfig::default();
//! let socket = NetlinkUeventSocket::open().unwrap();
//! let watcher = HotplugWatcher::spawn(socket, &config.hotplug, || {
//!     println!("devices changed");
//! }).unwrap();
//! // ...
//! watcher.stop();
//! ```

mod netlink;
mod uevent;

pub use netlink::NetlinkUeventSocket;
pub use uevent::Uevent;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::{HotplugConfig, DEBOUNCE_MS_RANGE};
use crate::error::{InventoryError, Result};

/// Hot-plug notification channel
pub trait UeventSource: Send {
    /// Block for at most `timeout`; `Ok(None)` when nothing arrived.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>>;

    /// Take one pending message without blocking.
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>>;
}

/// In-process channel source, fed through [`ChannelUeventSender`]
pub struct ChannelUeventSource {
    rx: Receiver<Vec<u8>>,
}

/// Sending half of [`ChannelUeventSource`]
#[derive(Clone)]
pub struct ChannelUeventSender {
    tx: Sender<Vec<u8>>,
}

impl ChannelUeventSource {
    pub fn pair() -> (ChannelUeventSender, Self) {
        let (tx, rx) = mpsc::channel();
        (ChannelUeventSender { tx }, Self { rx })
    }
}

impl ChannelUeventSender {
    /// Queue a raw message; `false` once the source is gone.
    pub fn send(&self, message: impl Into<Vec<u8>>) -> bool {
        self.tx.send(message.into()).is_ok()
    }

    /// Queue a kernel-format event for `subsystem`.
    pub fn send_event(&self, action: &str, devpath: &str, subsystem: &str) -> bool {
        let message = format!(
            "{action}@{devpath}\0ACTION={action}\0DEVPATH={devpath}\0SUBSYSTEM={subsystem}\0"
        );
        self.send(message.into_bytes())
    }
}

impl UeventSource for ChannelUeventSource {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // Keep the watcher's loop cadence once every sender is gone.
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }
}

/// Coalesces a burst of events into one deadline.
///
/// The deadline is set by the first event and not pushed back by later
/// ones, so a steady event stream still refreshes once per `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn notify(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.delay);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the pending deadline if it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Time left until the pending deadline, if any.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}

/// Background thread turning uevents into refresh requests
pub struct HotplugWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HotplugWatcher {
    /// Start watching. `on_change` runs on the watcher thread once per
    /// debounced burst.
    pub fn spawn<S, F>(source: S, config: &HotplugConfig, on_change: F) -> Result<Self>
    where
        S: UeventSource + 'static,
        F: Fn() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            source,
            allow: config.subsystems.clone(),
            poll: Duration::from_millis(config.poll_interval_ms.max(1)),
            debouncer: Debouncer::new(Duration::from_millis(clamped_debounce(config.debounce_ms))),
            stop: stop.clone(),
        };
        let handle = thread::Builder::new()
            .name("linman-hotplug".into())
            .spawn(move || worker.run(on_change))
            .map_err(|e| InventoryError::Hotplug(format!("spawn: {}", e)))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the thread to exit and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Hotplug watcher thread panicked");
            }
        }
    }
}

impl Drop for HotplugWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Keep the delay inside the supported window even for unvalidated configs.
fn clamped_debounce(ms: u64) -> u64 {
    ms.clamp(*DEBOUNCE_MS_RANGE.start(), *DEBOUNCE_MS_RANGE.end())
}

struct Worker<S> {
    source: S,
    allow: Vec<String>,
    poll: Duration,
    debouncer: Debouncer,
    stop: Arc<AtomicBool>,
}

impl<S: UeventSource> Worker<S> {
    fn run<F: Fn()>(mut self, on_change: F) {
        log::debug!("Hotplug watcher started for {:?}", self.allow);
        while !self.stop.load(Ordering::SeqCst) {
            let wait = self
                .debouncer
                .remaining(Instant::now())
                .map_or(self.poll, |left| left.min(self.poll));

            match self.source.recv_timeout(wait) {
                Ok(Some(message)) => {
                    self.accept(&message);
                    self.drain();
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Hotplug read failed: {}", e);
                    // Do not spin on a persistently failing channel.
                    thread::sleep(self.poll);
                }
            }

            if self.debouncer.fire(Instant::now()) {
                log::debug!("Hotplug burst settled, refreshing");
                on_change();
            }
        }
        log::debug!("Hotplug watcher stopped");
    }

    /// Consume everything already queued without blocking.
    fn drain(&mut self) {
        loop {
            match self.source.try_recv() {
                Ok(Some(message)) => self.accept(&message),
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Hotplug drain failed: {}", e);
                    break;
                }
            }
        }
    }

    fn accept(&mut self, message: &[u8]) {
        match Uevent::parse(message) {
            Ok(event) if event.matches(&self.allow) => {
                log::debug!(
                    "uevent {} {} ({})",
                    event.action,
                    event.devpath,
                    event.subsystem.as_deref().unwrap_or("?")
                );
                self.debouncer.notify(Instant::now());
            }
            Ok(_) => {}
            Err(e) => log::warn!("Ignoring malformed uevent: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn config(debounce_ms: u64) -> HotplugConfig {
        HotplugConfig {
            debounce_ms,
            poll_interval_ms: 20,
            ..HotplugConfig::default()
        }
    }

    fn counting() -> (Arc<AtomicUsize>, impl Fn() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_debouncer() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(500));
        assert!(!d.fire(t0));
        d.notify(t0);
        d.notify(t0 + Duration::from_millis(400));
        assert_eq!(d.remaining(t0), Some(Duration::from_millis(500)));
        assert!(!d.fire(t0 + Duration::from_millis(499)));
        assert!(d.fire(t0 + Duration::from_millis(500)));
        assert!(!d.is_pending());
        assert!(!d.fire(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn test_debounce_is_clamped() {
        assert_eq!(clamped_debounce(100), 500);
        assert_eq!(clamped_debounce(750), 750);
        assert_eq!(clamped_debounce(60_000), 1000);
    }

    #[test]
    fn test_burst_produces_one_refresh() {
        let (tx, source) = ChannelUeventSource::pair();
        let (count, on_change) = counting();
        for i in 0..8 {
            tx.send_event("add", &format!("/devices/pci0000:00/usb1/1-2/1-2:1.{i}"), "usb");
        }
        let watcher = HotplugWatcher::spawn(source, &config(500), on_change).unwrap();
        thread::sleep(Duration::from_millis(900));
        watcher.stop();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filtered_subsystem_is_ignored() {
        let (tx, source) = ChannelUeventSource::pair();
        let (count, on_change) = counting();
        tx.send_event("change", "/devices/virtual/thermal/thermal_zone0", "thermal");
        let watcher = HotplugWatcher::spawn(source, &config(500), on_change).unwrap();
        thread::sleep(Duration::from_millis(800));
        watcher.stop();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_malformed_event_does_not_stop_watcher() {
        let (tx, source) = ChannelUeventSource::pair();
        let (count, on_change) = counting();
        tx.send(b"\xff\xfe not a uevent".to_vec());
        tx.send(Vec::new());
        let watcher = HotplugWatcher::spawn(source, &config(500), on_change).unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(watcher.is_running());
        tx.send_event("remove", "/devices/virtual/net/veth0", "net");
        thread::sleep(Duration::from_millis(900));
        watcher.stop();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_separate_bursts_refresh_separately() {
        let (tx, source) = ChannelUeventSource::pair();
        let (count, on_change) = counting();
        let watcher = HotplugWatcher::spawn(source, &config(500), on_change).unwrap();
        tx.send_event("add", "/devices/x/block/sdb", "block");
        thread::sleep(Duration::from_millis(900));
        tx.send_event("remove", "/devices/x/block/sdb", "block");
        thread::sleep(Duration::from_millis(900));
        watcher.stop();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
