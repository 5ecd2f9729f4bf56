// ── Event-stream consumer ──
//
// One long-lived loop: connect, rebuild the catalog, seed the status cache
// from current light state, then reconcile live events until the stream
// ends or fails. Every disconnect is followed by a capped exponential
// backoff; a successful connect resets it.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use loxhue_api::models::{EventEntry, Light};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::{BridgeConfig, ReconnectPolicy};
use crate::error::CoreError;
use crate::model::{Catalog, Mapping};
use crate::status::StatusCache;
use crate::translate::{translate_event, translate_light};
use crate::udp::Category;
use crate::upstream::{Upstream, fetch_catalog};

/// Snapshot of the consumer for health reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamStatus {
    /// Connected and reading.
    pub active: bool,
    /// Active and an event arrived recently.
    pub healthy: bool,
    pub reconnect_attempts: u32,
    pub last_event_at: Option<DateTime<Utc>>,
    pub seconds_since_last_event: u64,
    pub batches_processed: u64,
}

struct Activity {
    at: Instant,
    wall: Option<DateTime<Utc>>,
}

struct Inner {
    upstream: Arc<dyn Upstream>,
    status: Arc<StatusCache>,
    catalog: Arc<ArcSwap<Catalog>>,
    mapping: Arc<ArcSwap<Mapping>>,
    reconnect: ReconnectPolicy,
    stale_after: Duration,
    debug: bool,

    active: AtomicBool,
    running: AtomicBool,
    attempts: AtomicU32,
    batches: AtomicU64,
    last_event: Mutex<Activity>,
    cancel: CancellationToken,
}

pub struct EventStreamConsumer {
    inner: Arc<Inner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventStreamConsumer {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        status: Arc<StatusCache>,
        catalog: Arc<ArcSwap<Catalog>>,
        mapping: Arc<ArcSwap<Mapping>>,
        config: &BridgeConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                upstream,
                status,
                catalog,
                mapping,
                reconnect: config.reconnect,
                stale_after: config.stale_after,
                debug: config.debug,
                active: AtomicBool::new(false),
                running: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
                batches: AtomicU64::new(0),
                last_event: Mutex::new(Activity {
                    at: Instant::now(),
                    wall: None,
                }),
                cancel,
            }),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the read loop. A second call while it runs does nothing.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            debug!("event stream already running");
            return;
        }
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run());
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn is_healthy(&self) -> bool {
        self.is_active() && self.inner.since_last_event() < self.inner.stale_after
    }

    pub fn status(&self) -> StreamStatus {
        let since = self.inner.since_last_event();
        StreamStatus {
            active: self.is_active(),
            healthy: self.is_healthy(),
            reconnect_attempts: self.inner.attempts.load(Ordering::SeqCst),
            last_event_at: self
                .inner
                .last_event
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .wall,
            seconds_since_last_event: since.as_secs(),
            batches_processed: self.inner.batches.load(Ordering::Relaxed),
        }
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        loop {
            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                outcome = self.session() => outcome,
            };
            self.active.store(false, Ordering::SeqCst);

            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            let delay = self.reconnect.delay(attempt);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            match outcome {
                Ok(()) => warn!(
                    category = %Category::System,
                    delay_ms,
                    "event stream ended, reconnecting"
                ),
                Err(e) => error!(
                    category = %Category::System,
                    error = %e,
                    attempt = attempt + 1,
                    delay_ms,
                    "event stream failed, reconnecting"
                ),
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        self.active.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        info!(category = %Category::System, "event stream stopped");
    }

    async fn session(&self) -> Result<(), CoreError> {
        debug!("opening event stream");
        let mut stream = self.upstream.open_event_stream().await?;

        self.attempts.store(0, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        info!(category = %Category::System, "event stream connected");

        self.resync().await;

        while let Some(batch) = stream.next().await {
            self.process(&batch?);
        }
        Ok(())
    }

    /// Rebuild the catalog and seed the cache from current light state.
    async fn resync(&self) {
        match fetch_catalog(self.upstream.as_ref()).await {
            Ok((catalog, lights)) => {
                self.catalog.store(Arc::new(catalog));
                self.seed(&lights);
            }
            Err(e) => {
                warn!(
                    category = %Category::System,
                    error = %e,
                    "catalog rebuild failed, keeping previous catalog"
                );
            }
        }
    }

    fn seed(&self, lights: &[Light]) {
        let mapping = self.mapping.load();
        let catalog = self.catalog.load();
        let mut seeded = 0_usize;
        for light in lights {
            let Some(entry) = mapping.find_for_service(&light.id, &catalog) else {
                continue;
            };
            for (attribute, value) in translate_light(light) {
                self.status.update(&entry.name, attribute, value, entry);
            }
            seeded += 1;
        }
        info!(category = %Category::System, lights = seeded, "initial status loaded");
    }

    fn process(&self, batch: &[EventEntry]) {
        let mapping = self.mapping.load();
        let catalog = self.catalog.load();

        for data in batch
            .iter()
            .filter(|e| e.carries_state())
            .flat_map(|e| e.data.iter())
        {
            let Some(entry) = mapping.find_for_service(&data.id, &catalog) else {
                trace!(id = %data.id, rtype = ?data.rtype, "unmapped event");
                continue;
            };
            for (attribute, value) in translate_event(data) {
                if self.debug {
                    debug!(
                        category = %Category::from(entry.kind),
                        name = %entry.name,
                        %attribute,
                        %value,
                        "event"
                    );
                }
                self.status.update(&entry.name, attribute, value, entry);
            }
        }

        self.batches.fetch_add(1, Ordering::Relaxed);
        *self.last_event.lock().unwrap_or_else(PoisonError::into_inner) = Activity {
            at: Instant::now(),
            wall: Some(Utc::now()),
        };
    }

    fn since_last_event(&self) -> Duration {
        self.last_event
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .at
            .elapsed()
    }
}
