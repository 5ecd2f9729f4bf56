// loxhue-core: Command dispatch and status reconciliation between a Hue bridge and a UDP controller.

pub mod bridge;
pub mod color;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod payload;
pub mod ratelimit;
pub mod status;
pub mod stream;
pub mod translate;
pub mod udp;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Bridge, BridgeStats, CommandOutcome, SceneAction};
pub use config::{BridgeConfig, RateLimits, ReconnectPolicy, TlsVerification};
pub use dispatch::{Command, DispatchStats, Dispatcher};
pub use error::CoreError;
pub use payload::{Transition, ValueCode, build_payload};
pub use ratelimit::{RateLimiter, RateLimiterStats, ResourceKind};
pub use status::{StatusCache, StatusStats, UpdateOutcome};
pub use stream::{EventStreamConsumer, StreamStatus};
pub use udp::{Category, DownstreamSink, SinkStats, UdpSink};
pub use upstream::Upstream;

pub use model::{
    Attribute, Capability, Catalog, DetectedItem, DeviceClass, DeviceDiagnostic, Mapping,
    MappingEntry, SceneSummary, StatusValue, Target, TargetKind,
};

// Callers configure retries without depending on loxhue-api directly.
pub use loxhue_api::RetryPolicy;
