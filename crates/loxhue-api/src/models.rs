// Wire types for the CLIP v2 resource API and its event stream.
//
// Every resource response is wrapped in `{ "errors": [...], "data": [...] }`.
// Fields the engine does not consume are left out; everything optional on
// the bridge side is `Option` here so a firmware update adding or dropping
// fields never breaks decoding.

use serde::{Deserialize, Serialize};

// ── Envelope ─────────────────────────────────────────────────────────

/// Standard response envelope of every resource endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceEnvelope<T> {
    #[serde(default)]
    pub errors: Vec<ApiErrorDescription>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDescription {
    pub description: String,
}

/// Identifier-write acknowledgement returned by `PUT`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceIdentifier {
    pub rid: String,
    #[serde(default)]
    pub rtype: Option<String>,
}

// ── Shared building blocks ───────────────────────────────────────────

/// Reference to another resource (`{ rid, rtype }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub rid: String,
    pub rtype: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub archetype: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnState {
    pub on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Dimming {
    pub brightness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Color {
    pub xy: Xy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MirekSchema {
    pub mirek_minimum: u16,
    pub mirek_maximum: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ColorTemperature {
    #[serde(default)]
    pub mirek: Option<u16>,
    #[serde(default)]
    pub mirek_valid: Option<bool>,
    #[serde(default)]
    pub mirek_schema: Option<MirekSchema>,
}

// ── Resources ────────────────────────────────────────────────────────

/// `light` resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Light {
    pub id: String,
    #[serde(default)]
    pub owner: Option<ResourceRef>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub on: Option<OnState>,
    #[serde(default)]
    pub dimming: Option<Dimming>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub color_temperature: Option<ColorTemperature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductData {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub model_id: Option<String>,
}

/// `device` resource: a physical device and the services it exposes.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub product_data: ProductData,
    #[serde(default)]
    pub services: Vec<ResourceRef>,
}

/// `room` or `zone` resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub services: Vec<ResourceRef>,
}

impl Group {
    /// The `grouped_light` service that addresses the whole group.
    pub fn grouped_light(&self) -> Option<&ResourceRef> {
        self.services.iter().find(|s| s.rtype == "grouped_light")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneAction {
    pub target: ResourceRef,
    #[serde(default)]
    pub action: serde_json::Value,
}

/// `scene` resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub group: Option<ResourceRef>,
    #[serde(default)]
    pub actions: Vec<SceneAction>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub palette: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PowerState {
    #[serde(default)]
    pub battery_level: Option<u8>,
}

/// `device_power` resource.
#[derive(Debug, Clone, Deserialize)]
pub struct DevicePower {
    pub id: String,
    pub owner: ResourceRef,
    #[serde(default)]
    pub power_state: Option<PowerState>,
}

/// `zigbee_connectivity` resource.
#[derive(Debug, Clone, Deserialize)]
pub struct ZigbeeConnectivity {
    pub id: String,
    pub owner: ResourceRef,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

// ── Write bodies ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimmingUpdate {
    pub brightness: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MirekUpdate {
    pub mirek: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorUpdate {
    pub xy: Xy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dynamics {
    /// Transition duration in milliseconds.
    pub duration: u32,
}

/// Body of `PUT /light/{id}` and `PUT /grouped_light/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LightUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<OnState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimming: Option<DimmingUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_temperature: Option<MirekUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamics: Option<Dynamics>,
}

impl LightUpdate {
    pub fn off() -> Self {
        Self {
            on: Some(OnState { on: false }),
            ..Self::default()
        }
    }

    /// `true` when the body only switches the light on or off.
    pub fn is_switch_only(&self) -> bool {
        self.on.is_some()
            && self.dimming.is_none()
            && self.color_temperature.is_none()
            && self.color.is_none()
    }
}

/// Body of `PUT /scene/{id}` that recalls a scene.
#[derive(Debug, Clone, Serialize)]
pub struct SceneRecall {
    pub recall: RecallAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecallAction {
    pub action: String,
}

impl SceneRecall {
    pub fn active() -> Self {
        Self {
            recall: RecallAction {
                action: "active".into(),
            },
        }
    }
}

// ── Event stream ─────────────────────────────────────────────────────

/// Kind of an event-stream entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Add,
    Update,
    Delete,
    Error,
    #[serde(other)]
    Unknown,
}

/// One entry of a `data: [...]` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEntry {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub data: Vec<EventData>,
}

impl EventEntry {
    /// Only additions and updates carry state worth reconciling.
    pub fn carries_state(&self) -> bool {
        matches!(self.kind, EventKind::Add | EventKind::Update)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MotionReport {
    #[serde(default)]
    pub motion: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TemperatureReport {
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LightLevelReport {
    #[serde(default)]
    pub light_level: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ButtonReport {
    #[serde(default)]
    pub last_event: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rotation {
    pub direction: String,
    #[serde(default)]
    pub steps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RotaryReport {
    #[serde(default)]
    pub rotation: Option<Rotation>,
}

/// `relative_rotary` payload. Firmware revisions put the rotation under
/// `rotary_report`, `last_event`, or directly on the object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelativeRotary {
    #[serde(default)]
    pub rotary_report: Option<RotaryReport>,
    #[serde(default)]
    pub last_event: Option<RotaryReport>,
    #[serde(default)]
    pub rotation: Option<Rotation>,
}

impl RelativeRotary {
    pub fn rotation(&self) -> Option<&Rotation> {
        self.rotary_report
            .as_ref()
            .and_then(|r| r.rotation.as_ref())
            .or_else(|| self.last_event.as_ref().and_then(|r| r.rotation.as_ref()))
            .or(self.rotation.as_ref())
    }
}

/// A changed resource inside an event entry. Only the fields that changed
/// are present.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub id: String,
    #[serde(rename = "type", default)]
    pub rtype: Option<String>,
    #[serde(default)]
    pub owner: Option<ResourceRef>,
    #[serde(default)]
    pub on: Option<OnState>,
    #[serde(default)]
    pub dimming: Option<Dimming>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub color_temperature: Option<ColorTemperature>,
    #[serde(default)]
    pub motion: Option<MotionReport>,
    #[serde(default)]
    pub temperature: Option<TemperatureReport>,
    #[serde(default)]
    pub light: Option<LightLevelReport>,
    #[serde(default)]
    pub button: Option<ButtonReport>,
    #[serde(default)]
    pub power_state: Option<PowerState>,
    #[serde(default)]
    pub relative_rotary: Option<RelativeRotary>,
}
