// ── Command dispatcher ──
//
// Per-target serialization with coalescing. A target is either idle (no
// slot), busy, or busy with exactly one pending command. Submitting to a
// busy target overwrites the pending command, so a burst collapses to the
// latest desired state. Each busy target is driven by one spawned loop that
// sends through the rate limiter and then takes the pending command, if any.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use loxhue_api::models::LightUpdate;
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Attribute, MappingEntry};
use crate::ratelimit::{RateLimiter, ResourceKind};
use crate::status::StatusCache;
use crate::upstream::Upstream;

/// One desired state for one upstream resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub target_id: String,
    pub kind: ResourceKind,
    pub update: LightUpdate,
    /// Mapping entry the command came from; drives the optimistic status
    /// update after a successful send.
    pub source: Option<MappingEntry>,
}

enum Slot {
    Busy,
    BusyWithPending(Command),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub submitted: u64,
    pub sent: u64,
    pub failed: u64,
    /// Pending commands overwritten before they were sent.
    pub coalesced: u64,
    pub busy_targets: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
    coalesced: AtomicU64,
}

struct Inner {
    upstream: Arc<dyn Upstream>,
    limiter: Arc<RateLimiter>,
    status: Arc<StatusCache>,
    slots: DashMap<String, Slot>,
    active: watch::Sender<usize>,
    counters: Counters,
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        limiter: Arc<RateLimiter>,
        status: Arc<StatusCache>,
    ) -> Self {
        let (active, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                upstream,
                limiter,
                status,
                slots: DashMap::new(),
                active,
                counters: Counters::default(),
            }),
        }
    }

    /// Fire-and-forget. Never waits on the network.
    pub fn submit(&self, command: Command) {
        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let start = match self.inner.slots.entry(command.target_id.clone()) {
            Entry::Occupied(mut slot) => {
                if matches!(slot.get(), Slot::BusyWithPending(_)) {
                    self.inner.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!(target_id = %command.target_id, "coalescing pending command");
                }
                *slot.get_mut() = Slot::BusyWithPending(command);
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot::Busy);
                Some(command)
            }
        };

        if let Some(command) = start {
            self.inner.active.send_modify(|n| *n += 1);
            tokio::spawn(drive(Arc::clone(&self.inner), command));
        }
    }

    /// Resolves once no target is busy.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.active.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot fail.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    pub fn is_busy(&self, target_id: &str) -> bool {
        self.inner.slots.contains_key(target_id)
    }

    pub fn stats(&self) -> DispatchStats {
        let c = &self.inner.counters;
        DispatchStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            sent: c.sent.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            coalesced: c.coalesced.load(Ordering::Relaxed),
            busy_targets: self.inner.slots.len(),
        }
    }
}

async fn drive(inner: Arc<Inner>, first: Command) {
    let target_id = first.target_id.clone();
    let mut next = Some(first);

    while let Some(command) = next {
        match inner.send(&command).await {
            Ok(()) => {
                inner.counters.sent.fetch_add(1, Ordering::Relaxed);
                inner.record_optimistic(&command);
            }
            Err(e) => {
                inner.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    target_id = %command.target_id,
                    kind = %command.kind,
                    error = %e,
                    "command failed"
                );
            }
        }
        next = inner.take_pending(&target_id);
    }

    inner.active.send_modify(|n| *n = n.saturating_sub(1));
}

impl Inner {
    async fn send(&self, command: &Command) -> Result<(), CoreError> {
        let (tx, rx) = oneshot::channel();
        let upstream = Arc::clone(&self.upstream);
        let kind = command.kind;
        let id = command.target_id.clone();
        let update = command.update.clone();

        self.limiter.enqueue(kind, async move {
            let result = upstream.update_light(kind, &id, &update).await;
            let _ = tx.send(result);
        });

        match rx.await {
            Ok(result) => result.map_err(CoreError::from),
            Err(_) => Err(CoreError::Internal("rate limiter stopped".into())),
        }
    }

    /// Move the pending command out of the slot, or free the slot.
    fn take_pending(&self, target_id: &str) -> Option<Command> {
        match self.slots.entry(target_id.to_owned()) {
            Entry::Occupied(mut slot) => match std::mem::replace(slot.get_mut(), Slot::Busy) {
                Slot::BusyWithPending(command) => Some(command),
                Slot::Busy => {
                    slot.remove();
                    None
                }
            },
            Entry::Vacant(_) => None,
        }
    }

    fn record_optimistic(&self, command: &Command) {
        let Some(entry) = &command.source else {
            return;
        };
        if let Some(on) = command.update.on {
            self.status.update(&entry.name, Attribute::On, on.on, entry);
        }
        if let Some(dimming) = command.update.dimming {
            self.status
                .update(&entry.name, Attribute::Bri, dimming.brightness, entry);
        }
    }
}
