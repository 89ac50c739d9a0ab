// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Single-flight refresh coordination
//!
//! Manual scans and hot-plug bursts both call
//! [`RefreshCoordinator::request`]. At most one refresh runs at a time; a
//! request arriving while one is in flight is folded into a single extra run
//! performed by the thread that already holds the flight.
//! [`RefreshCoordinator::request_in_background`] does the same without
//! blocking the caller, which keeps the hot-plug reader draining its socket.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use crate::error::{InventoryError, Result};
use crate::inventory::{Aggregator, Snapshot};

/// Receives every completed snapshot
pub trait SnapshotSink: Send + Sync {
    fn publish(&self, snapshot: &Snapshot);
}

impl<F> SnapshotSink for F
where
    F: Fn(&Snapshot) + Send + Sync,
{
    fn publish(&self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

/// What happened to a refresh request
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// This caller ran the refresh (plus any coalesced follow-ups); the
    /// last snapshot produced is returned.
    Completed(Arc<Snapshot>),
    /// Another refresh was in flight; it will run once more on our behalf.
    Coalesced,
}

#[derive(Debug, Default)]
struct Flight {
    in_flight: bool,
    pending: bool,
}

/// Single-flight guard around an [`Aggregator`]
pub struct RefreshCoordinator {
    aggregator: Mutex<Aggregator>,
    flight: Mutex<Flight>,
    latest: Mutex<Option<Arc<Snapshot>>>,
    sink: Arc<dyn SnapshotSink>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clears `in_flight` even if a refresh panics.
struct FlightGuard<'a> {
    flight: &'a Mutex<Flight>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut flight = lock(self.flight);
        flight.in_flight = false;
        flight.pending = false;
    }
}

impl RefreshCoordinator {
    pub fn new(aggregator: Aggregator, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            aggregator: Mutex::new(aggregator),
            flight: Mutex::new(Flight::default()),
            latest: Mutex::new(None),
            sink,
        }
    }

    /// Request a refresh.
    pub fn request(&self) -> RefreshOutcome {
        {
            let mut flight = lock(&self.flight);
            if flight.in_flight {
                flight.pending = true;
                log::debug!("Refresh in flight, coalescing request");
                return RefreshOutcome::Coalesced;
            }
            flight.in_flight = true;
        }
        let _guard = FlightGuard {
            flight: &self.flight,
        };

        loop {
            let snapshot = Arc::new(lock(&self.aggregator).refresh());
            *lock(&self.latest) = Some(snapshot.clone());
            self.sink.publish(&snapshot);

            let mut flight = lock(&self.flight);
            if flight.pending {
                flight.pending = false;
                continue;
            }
            // The guard clears `in_flight` after this lock is released.
            drop(flight);
            return RefreshOutcome::Completed(snapshot);
        }
    }

    /// Request a refresh on a worker thread and return at once.
    ///
    /// If a refresh is already running the request is coalesced into it
    /// and no thread is started.
    pub fn request_in_background(self: &Arc<Self>) -> Result<()> {
        {
            let mut flight = lock(&self.flight);
            if flight.in_flight {
                flight.pending = true;
                log::debug!("Refresh in flight, coalescing background request");
                return Ok(());
            }
        }
        let this = Arc::clone(self);
        thread::Builder::new()
            .name("linman-refresh".into())
            .spawn(move || {
                this.request();
            })
            .map_err(|e| InventoryError::Hotplug(format!("spawn refresh: {}", e)))?;
        Ok(())
    }

    /// Most recent snapshot, if any refresh has completed.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        lock(&self.latest).clone()
    }

    pub fn is_refreshing(&self) -> bool {
        lock(&self.flight).in_flight
    }
}
