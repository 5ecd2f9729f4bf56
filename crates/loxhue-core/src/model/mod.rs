// ── Domain model ──
//
// Mapping table, device catalog, status attributes, and the inventory
// views built from bridge resources.

pub mod catalog;
pub mod inventory;
pub mod mapping;
pub mod status;

// ── Re-exports ──────────────────────────────────────────────────────

pub use catalog::{Capability, Catalog, ServiceIdentity};
pub use inventory::{
    DetectedItem, DeviceClass, DeviceDiagnostic, SceneGroup, SceneLight, SceneSummary, Target,
    build_diagnostics, build_scenes, build_targets,
};
pub use mapping::{ALL_LIGHTS_NAMES, ALL_LIGHTS_UUID, Mapping, MappingEntry, TargetKind, is_valid_name};
pub use status::{Attribute, StatusValue};
