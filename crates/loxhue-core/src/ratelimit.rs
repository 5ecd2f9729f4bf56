// ── Outbound rate limiter ──
//
// One FIFO queue per resource kind, each drained by its own task. A queue
// runs a single task at a time and then sleeps its configured spacing
// before taking the next, so the bridge never sees bursts faster than the
// spacing regardless of how quickly commands arrive.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::RateLimits;

type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Bridge write endpoints, each with its own queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Light,
    GroupedLight,
}

impl ResourceKind {
    /// Parse a bridge resource type. Anything unknown shares the light queue.
    pub fn from_resource_type(rtype: &str) -> Self {
        rtype.parse().unwrap_or(Self::Light)
    }

    /// Path segment of the write endpoint.
    pub fn path(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::GroupedLight => "grouped_light",
        }
    }
}

// ── Stats ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: bool,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimiterStats {
    pub light: QueueStats,
    pub grouped_light: QueueStats,
}

#[derive(Debug, Default)]
struct QueueCounters {
    pending: AtomicUsize,
    processing: AtomicBool,
}

// ── Queue ────────────────────────────────────────────────────────────

struct Queue {
    tx: mpsc::UnboundedSender<Task>,
    counters: Arc<QueueCounters>,
    delay: Duration,
}

impl Queue {
    fn spawn(kind: ResourceKind, delay: Duration, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(QueueCounters::default());
        tokio::spawn(drain(kind, rx, Arc::clone(&counters), delay, cancel));
        Self {
            tx,
            counters,
            delay,
        }
    }

    fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.counters.pending.load(Ordering::Relaxed),
            processing: self.counters.processing.load(Ordering::Relaxed),
            delay_ms: u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

async fn drain(
    kind: ResourceKind,
    mut rx: mpsc::UnboundedReceiver<Task>,
    counters: Arc<QueueCounters>,
    delay: Duration,
    cancel: CancellationToken,
) {
    loop {
        let task = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(task) => task,
                None => break,
            },
        };

        counters.pending.fetch_sub(1, Ordering::Relaxed);
        counters.processing.store(true, Ordering::Relaxed);
        trace!(%kind, "rate limiter running task");

        // In-flight writes are never cancelled; shutdown waits for them.
        task.await;

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
        counters.processing.store(false, Ordering::Relaxed);
    }
    debug!(%kind, "rate limiter queue stopped");
}

// ── RateLimiter ──────────────────────────────────────────────────────

/// Per-kind FIFO queues with fixed spacing. Must be created inside a tokio
/// runtime; the drain tasks stop when `cancel` fires.
pub struct RateLimiter {
    light: Queue,
    grouped_light: Queue,
}

impl RateLimiter {
    pub fn new(limits: &RateLimits, cancel: &CancellationToken) -> Self {
        Self {
            light: Queue::spawn(ResourceKind::Light, limits.light, cancel.child_token()),
            grouped_light: Queue::spawn(
                ResourceKind::GroupedLight,
                limits.grouped_light,
                cancel.child_token(),
            ),
        }
    }

    fn queue(&self, kind: ResourceKind) -> &Queue {
        match kind {
            ResourceKind::Light => &self.light,
            ResourceKind::GroupedLight => &self.grouped_light,
        }
    }

    /// Append `task` to the queue for `kind` and return immediately.
    ///
    /// After shutdown the task is dropped unrun.
    pub fn enqueue<F>(&self, kind: ResourceKind, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let queue = self.queue(kind);
        queue.counters.pending.fetch_add(1, Ordering::Relaxed);
        if queue.tx.send(Box::pin(task)).is_err() {
            queue.counters.pending.fetch_sub(1, Ordering::Relaxed);
            debug!(%kind, "rate limiter stopped, dropping task");
        }
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            light: self.light.stats(),
            grouped_light: self.grouped_light.stats(),
        }
    }
}
