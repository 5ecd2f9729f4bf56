// ── Bridge facade ──
//
// Owns one bridge connection and one controller endpoint: the rate limiter,
// the dispatcher, the status cache, the event-stream consumer, and the
// shared catalog/mapping tables. Inbound controller commands and all
// inventory queries go through here.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use loxhue_api::HueClient;
use loxhue_api::models::LightUpdate;
use serde::Serialize;
use strum::{Display, EnumString};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::dispatch::{Command, DispatchStats, Dispatcher};
use crate::error::CoreError;
use crate::model::{
    ALL_LIGHTS_NAMES, Catalog, DetectedItem, DeviceDiagnostic, Mapping, MappingEntry,
    SceneSummary, Target, build_diagnostics, build_scenes, build_targets, is_valid_name,
};
use crate::payload::{Transition, ValueCode, build_payload};
use crate::ratelimit::{RateLimiter, RateLimiterStats, ResourceKind};
use crate::status::{StatusCache, StatusStats};
use crate::stream::{EventStreamConsumer, StreamStatus};
use crate::udp::{Category, DownstreamSink, SinkStats, UdpSink};
use crate::upstream::{Upstream, fetch_catalog};

/// Unmapped names kept for mapping setup; oldest evicted first.
const MAX_DETECTED_ITEMS: usize = 10;

// ── Public result types ──────────────────────────────────────────────

/// What happened to an inbound controller command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Handed to the dispatcher for one target.
    Dispatched { target_id: String, kind: ResourceKind },
    /// All-lights sequence started over this many targets.
    Sequence { targets: usize },
    /// Name is not mapped; remembered in the detected list.
    Recorded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SceneAction {
    On,
    Off,
}

#[derive(Debug, Clone, Serialize)]
pub struct BridgeStats {
    pub dispatch: DispatchStats,
    pub rate_limiter: RateLimiterStats,
    pub udp: SinkStats,
    pub status: StatusStats,
    pub stream: StreamStatus,
    pub mapped: usize,
}

// ── Bridge ───────────────────────────────────────────────────────────

/// Cheaply cloneable handle.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    upstream: Arc<dyn Upstream>,
    limiter: Arc<RateLimiter>,
    dispatcher: Dispatcher,
    status: Arc<StatusCache>,
    catalog: Arc<ArcSwap<Catalog>>,
    mapping: Arc<ArcSwap<Mapping>>,
    stream: EventStreamConsumer,
    detected: Mutex<VecDeque<DetectedItem>>,
    cancel: CancellationToken,
    sequences: Mutex<Vec<JoinHandle<()>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Connect the HTTPS client and bind the UDP socket. Nothing is
    /// contacted until [`start`](Self::start) or the first command.
    pub async fn new(config: BridgeConfig, mapping: Mapping) -> Result<Self, CoreError> {
        if !config.is_configured() {
            return Err(CoreError::NotConfigured);
        }
        let client = HueClient::new(
            &config.host,
            &config.app_key,
            &config.transport(),
            config.retry,
        )?;
        let sink = UdpSink::bind(config.controller, config.namespace.clone(), config.debug).await?;
        info!(
            host = %config.host,
            controller = ?config.controller,
            mapped = mapping.len(),
            "bridge ready"
        );
        Ok(Self::with_parts(
            config,
            mapping,
            Arc::new(client),
            Arc::new(sink),
        ))
    }

    /// Assemble from an explicit upstream and sink. Must run inside a tokio
    /// runtime (the rate limiter spawns its queues here).
    pub fn with_parts(
        config: BridgeConfig,
        mapping: Mapping,
        upstream: Arc<dyn Upstream>,
        sink: Arc<dyn DownstreamSink>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let limiter = Arc::new(RateLimiter::new(&config.rate_limits, &cancel));
        let status = Arc::new(StatusCache::new(sink));
        let dispatcher = Dispatcher::new(
            Arc::clone(&upstream),
            Arc::clone(&limiter),
            Arc::clone(&status),
        );
        let catalog = Arc::new(ArcSwap::from_pointee(Catalog::default()));
        let mapping = Arc::new(ArcSwap::from_pointee(mapping));
        let stream = EventStreamConsumer::new(
            Arc::clone(&upstream),
            Arc::clone(&status),
            Arc::clone(&catalog),
            Arc::clone(&mapping),
            &config,
            cancel.child_token(),
        );

        Self {
            inner: Arc::new(BridgeInner {
                config,
                upstream,
                limiter,
                dispatcher,
                status,
                catalog,
                mapping,
                stream,
                detected: Mutex::new(VecDeque::new()),
                cancel,
                sequences: Mutex::new(Vec::new()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the event stream and, if configured, periodic catalog refresh.
    /// Idempotent.
    pub fn start(&self) -> Result<(), CoreError> {
        if !self.inner.config.is_configured() {
            return Err(CoreError::NotConfigured);
        }
        self.inner.stream.start();

        let interval = self.inner.config.catalog_refresh_secs;
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if interval > 0 && tasks.is_empty() {
            let inner = Arc::clone(&self.inner);
            tasks.push(tokio::spawn(catalog_refresh_task(
                inner,
                Duration::from_secs(interval),
            )));
        }
        Ok(())
    }

    /// Stop background work. In-flight writes finish; queued ones are dropped.
    pub async fn shutdown(&self) {
        info!(category = %Category::System, "shutting down");
        self.inner.cancel.cancel();
        self.inner.stream.stop().await;

        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            let mut sequences = self
                .inner
                .sequences
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            tasks.drain(..).chain(sequences.drain(..)).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Resolves once every started sequence has been submitted and no target
    /// has a write in flight or pending.
    pub async fn wait_idle(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = self
                .inner
                .sequences
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..)
                .collect();
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
        self.inner.dispatcher.wait_idle().await;
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Handle `name`/`value` from the controller with the default transition.
    pub fn submit_command(&self, name: &str, value: &str) -> Result<CommandOutcome, CoreError> {
        self.submit_command_with_transition(name, value, None)
    }

    /// Like [`submit_command`](Self::submit_command), with an optional
    /// transition override in milliseconds.
    pub fn submit_command_with_transition(
        &self,
        name: &str,
        value: &str,
        transition_ms: Option<u32>,
    ) -> Result<CommandOutcome, CoreError> {
        if !self.inner.config.is_configured() {
            return Err(CoreError::NotConfigured);
        }
        let name = name.trim().to_lowercase();
        if !is_valid_name(&name) {
            return Err(CoreError::InvalidName { name });
        }
        let code = ValueCode::parse(value.trim())?;
        debug!(category = %Category::Light, name = %name, %code, "command");

        let mapping = self.inner.mapping.load_full();
        let entry = mapping.find_by_name(&name);

        if ALL_LIGHTS_NAMES.contains(&name.as_str()) || entry.is_some_and(MappingEntry::is_all_lights)
        {
            let targets = self.start_sequence(&mapping, code);
            return Ok(CommandOutcome::Sequence { targets });
        }

        let Some(entry) = entry else {
            self.record_detected(&name);
            info!(category = %Category::System, name = %name, "unmapped command recorded");
            return Ok(CommandOutcome::Recorded);
        };

        if !entry.kind.is_controllable() {
            return Err(CoreError::ReadOnlyDevice {
                name,
                kind: entry.kind.to_string(),
            });
        }

        let transition = Transition {
            default_ms: self.inner.config.transition_ms,
            forced_ms: transition_ms,
        };
        let command = self.inner.command_for(entry, code, transition);
        let outcome = CommandOutcome::Dispatched {
            target_id: command.target_id.clone(),
            kind: command.kind,
        };
        self.inner.dispatcher.submit(command);
        Ok(outcome)
    }

    /// Submit `code` to every mapped light and group, one at a time with
    /// the configured pacing and no transition.
    fn start_sequence(&self, mapping: &Mapping, code: ValueCode) -> usize {
        let targets: Vec<MappingEntry> = mapping.controllable().cloned().collect();
        let count = targets.len();
        info!(category = %Category::Light, targets = count, %code, "starting all-lights sequence");

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let pacing = inner.config.rate_limits.sequence_pacing;
            let transition = Transition::forced(inner.config.transition_ms, 0);
            for (i, entry) in targets.iter().enumerate() {
                if i > 0 {
                    tokio::select! {
                        biased;
                        () = inner.cancel.cancelled() => return,
                        () = tokio::time::sleep(pacing) => {}
                    }
                }
                let command = inner.command_for(entry, code, transition);
                inner.dispatcher.submit(command);
            }
            info!(category = %Category::Light, "all-lights sequence submitted");
        });

        let mut sequences = self
            .inner
            .sequences
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        sequences.retain(|h| !h.is_finished());
        sequences.push(handle);
        count
    }

    fn record_detected(&self, name: &str) {
        let mut detected = self
            .inner
            .detected
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if detected.iter().any(|d| d.name == name) {
            return;
        }
        detected.push_back(DetectedItem::command(name));
        while detected.len() > MAX_DETECTED_ITEMS {
            detected.pop_front();
        }
    }

    /// Newest first.
    pub fn detected_items(&self) -> Vec<DetectedItem> {
        self.inner
            .detected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .cloned()
            .collect()
    }

    // ── Scenes ───────────────────────────────────────────────────────

    /// `On` recalls the scene. `Off` switches off every light the scene
    /// touches, through the dispatcher; returns how many were submitted.
    pub async fn submit_scene_activation(
        &self,
        id: &str,
        action: SceneAction,
    ) -> Result<usize, CoreError> {
        if !self.inner.config.is_configured() {
            return Err(CoreError::NotConfigured);
        }
        let id = id.trim();
        if uuid::Uuid::parse_str(id).is_err() {
            return Err(CoreError::InvalidScene { id: id.to_owned() });
        }
        let not_found = |e: loxhue_api::Error| {
            if e.is_not_found() {
                CoreError::SceneNotFound { id: id.to_owned() }
            } else {
                CoreError::from(e)
            }
        };

        match action {
            SceneAction::On => {
                self.inner.upstream.recall_scene(id).await.map_err(not_found)?;
                info!(category = %Category::Scene, scene = id, "scene activated");
                Ok(0)
            }
            SceneAction::Off => {
                let scene = self
                    .inner
                    .upstream
                    .get_scene(id)
                    .await
                    .map_err(not_found)?
                    .ok_or_else(|| CoreError::SceneNotFound { id: id.to_owned() })?;

                let lights: Vec<&str> = scene
                    .actions
                    .iter()
                    .filter(|a| a.target.rtype == "light")
                    .map(|a| a.target.rid.as_str())
                    .collect();
                if lights.is_empty() {
                    warn!(category = %Category::Scene, scene = id, "scene has no lights to turn off");
                    return Ok(0);
                }
                for rid in &lights {
                    self.inner.dispatcher.submit(Command {
                        target_id: (*rid).to_owned(),
                        kind: ResourceKind::Light,
                        update: LightUpdate::off(),
                        source: None,
                    });
                }
                info!(category = %Category::Scene, scene = id, lights = lights.len(), "scene deactivated");
                Ok(lights.len())
            }
        }
    }

    // ── Inventory ────────────────────────────────────────────────────

    /// Rebuild the catalog from the bridge.
    pub async fn refresh_catalog(&self) -> Result<(), CoreError> {
        self.inner.refresh_catalog().await.map(|_| ())
    }

    /// Everything a controller name can be mapped to. Rebuilds the catalog.
    pub async fn list_targets(&self) -> Result<Vec<Target>, CoreError> {
        let upstream = self.inner.upstream.as_ref();
        let (devices, lights, rooms, zones) = tokio::try_join!(
            upstream.list_devices(),
            upstream.list_lights(),
            upstream.list_rooms(),
            upstream.list_zones(),
        )?;
        let catalog = Catalog::from_inventory(&devices, &lights);
        let groups: Vec<_> = rooms.into_iter().chain(zones).collect();
        let targets = build_targets(&catalog, &lights, &groups, &devices);
        self.inner.catalog.store(Arc::new(catalog));
        Ok(targets)
    }

    pub async fn list_scenes(&self) -> Result<Vec<SceneSummary>, CoreError> {
        let upstream = self.inner.upstream.as_ref();
        let (scenes, lights, rooms, zones) = tokio::try_join!(
            upstream.list_scenes(),
            upstream.list_lights(),
            upstream.list_rooms(),
            upstream.list_zones(),
        )?;
        let groups: Vec<_> = rooms.into_iter().chain(zones).collect();
        Ok(build_scenes(&scenes, &lights, &groups))
    }

    pub async fn diagnostics(&self) -> Result<Vec<DeviceDiagnostic>, CoreError> {
        let upstream = self.inner.upstream.as_ref();
        let (devices, zigbee, power) = tokio::try_join!(
            upstream.list_devices(),
            upstream.list_zigbee_connectivity(),
            upstream.list_device_power(),
        )?;
        Ok(build_diagnostics(&devices, &zigbee, &power))
    }

    // ── Mapping & status ─────────────────────────────────────────────

    pub fn mapping(&self) -> Arc<Mapping> {
        self.inner.mapping.load_full()
    }

    /// Replace the mapping table. Status entries and detected items for
    /// names that are now mapped or gone are dropped.
    pub fn set_mapping(&self, mapping: Mapping) {
        let names = mapping.names();
        self.inner
            .detected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|d| !names.contains(&d.name));
        let removed = self.inner.status.cleanup(&names);
        info!(
            category = %Category::System,
            entries = mapping.len(),
            removed,
            "mapping replaced"
        );
        self.inner.mapping.store(Arc::new(mapping));
    }

    pub fn status(&self) -> &StatusCache {
        &self.inner.status
    }

    pub fn stream_status(&self) -> StreamStatus {
        self.inner.stream.status()
    }

    pub fn is_healthy(&self) -> bool {
        self.inner.stream.is_healthy()
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            dispatch: self.inner.dispatcher.stats(),
            rate_limiter: self.inner.limiter.stats(),
            udp: self.inner.status.sink_stats(),
            status: self.inner.status.stats(),
            stream: self.inner.stream.status(),
            mapped: self.inner.mapping.load().len(),
        }
    }
}

impl BridgeInner {
    fn command_for(&self, entry: &MappingEntry, code: ValueCode, transition: Transition) -> Command {
        let catalog = self.catalog.load();
        let update = build_payload(code, catalog.capability(&entry.uuid), transition);
        Command {
            target_id: entry.uuid.clone(),
            kind: entry.kind.resource_kind(),
            update,
            source: Some(entry.clone()),
        }
    }

    async fn refresh_catalog(&self) -> Result<Arc<Catalog>, CoreError> {
        let (catalog, _) = fetch_catalog(self.upstream.as_ref()).await?;
        let catalog = Arc::new(catalog);
        self.catalog.store(Arc::clone(&catalog));
        Ok(catalog)
    }
}

async fn catalog_refresh_task(inner: Arc<BridgeInner>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = inner.cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = inner.refresh_catalog().await {
                    warn!(category = %Category::System, error = %e, "periodic catalog refresh failed");
                }
            }
        }
    }
    debug!("catalog refresh task stopped");
}
