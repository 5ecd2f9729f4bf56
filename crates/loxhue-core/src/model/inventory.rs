// ── Inventory views ──
//
// Read-only projections of the bridge inventory used for mapping setup and
// health checks: mappable targets, scenes, and per-device diagnostics.
// Builders are pure functions over already-fetched resources.

use std::cmp::Ordering;
use std::collections::HashMap;

use loxhue_api::models::{Device, DevicePower, Group, Light, Scene, ZigbeeConnectivity};
use serde::Serialize;
use strum::Display;

use super::catalog::{Capability, Catalog};
use super::mapping::TargetKind;

// ── Targets ─────────────────────────────────────────────────────────

/// Something a controller name can be mapped to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub uuid: String,
    pub name: String,
    pub kind: TargetKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capability>,
}

pub fn build_targets(
    catalog: &Catalog,
    lights: &[Light],
    groups: &[Group],
    devices: &[Device],
) -> Vec<Target> {
    let mut targets: Vec<Target> = lights
        .iter()
        .map(|light| Target {
            uuid: light.id.clone(),
            name: light.metadata.name.clone(),
            kind: TargetKind::Light,
            capabilities: catalog.capability(&light.id).copied(),
        })
        .collect();

    targets.extend(groups.iter().filter_map(|group| {
        group.grouped_light().map(|service| Target {
            uuid: service.rid.clone(),
            name: group.metadata.name.clone(),
            kind: TargetKind::Group,
            capabilities: None,
        })
    }));

    for device in devices {
        let name = &device.metadata.name;
        let services_of = |rtype: &str| {
            device
                .services
                .iter()
                .filter(|s| s.rtype == rtype)
                .collect::<Vec<_>>()
        };

        if let Some(motion) = services_of("motion").first() {
            targets.push(Target {
                uuid: motion.rid.clone(),
                name: name.clone(),
                kind: TargetKind::Sensor,
                capabilities: None,
            });
        }

        let buttons = services_of("button");
        let several = buttons.len() > 1;
        for (index, button) in buttons.iter().enumerate() {
            targets.push(Target {
                uuid: button.rid.clone(),
                name: if several {
                    format!("{name} (Button {})", index + 1)
                } else {
                    name.clone()
                },
                kind: TargetKind::Button,
                capabilities: None,
            });
        }

        if let Some(dial) = services_of("relative_rotary").first() {
            targets.push(Target {
                uuid: dial.rid.clone(),
                name: format!("{name} (Dial)"),
                kind: TargetKind::Button,
                capabilities: None,
            });
        }
    }

    targets.sort_by(|a, b| compare_names(&a.name, &b.name));
    targets
}

// ── Scenes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneLight {
    pub uuid: String,
    pub name: String,
    pub action: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneGroup {
    pub uuid: String,
    pub name: String,
    /// `room` or `zone`.
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    pub uuid: String,
    pub name: String,
    pub lights: Vec<SceneLight>,
    pub group: Option<SceneGroup>,
    pub speed: Option<f64>,
    pub palette: Option<serde_json::Value>,
}

impl SceneSummary {
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }
}

pub fn build_scenes(scenes: &[Scene], lights: &[Light], groups: &[Group]) -> Vec<SceneSummary> {
    let light_names: HashMap<&str, &str> = lights
        .iter()
        .map(|l| (l.id.as_str(), l.metadata.name.as_str()))
        .collect();
    let group_index: HashMap<&str, &Group> = groups.iter().map(|g| (g.id.as_str(), g)).collect();

    let mut out: Vec<SceneSummary> = scenes
        .iter()
        .map(|scene| {
            let lights = scene
                .actions
                .iter()
                .filter_map(|action| {
                    light_names
                        .get(action.target.rid.as_str())
                        .map(|name| SceneLight {
                            uuid: action.target.rid.clone(),
                            name: (*name).to_owned(),
                            action: action.action.clone(),
                        })
                })
                .collect();

            let group = scene.group.as_ref().and_then(|r| {
                group_index.get(r.rid.as_str()).map(|g| SceneGroup {
                    uuid: r.rid.clone(),
                    name: g.metadata.name.clone(),
                    kind: g.kind.clone(),
                })
            });

            let name = if scene.metadata.name.is_empty() {
                "Unnamed Scene".to_owned()
            } else {
                scene.metadata.name.clone()
            };

            SceneSummary {
                uuid: scene.id.clone(),
                name,
                lights,
                group,
                speed: scene.speed,
                palette: scene.palette.clone(),
            }
        })
        .collect();

    out.sort_by(|a, b| compare_names(&a.name, &b.name));
    out
}

// ── Diagnostics ─────────────────────────────────────────────────────

/// Coarse device class for the diagnostics table. Variant order is the
/// display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceClass {
    Bridge,
    Light,
    Other,
    Sensor,
    Switch,
}

impl DeviceClass {
    fn of(device: &Device) -> Self {
        let has = |rtype: &str| device.services.iter().any(|s| s.rtype == rtype);
        if has("light") {
            Self::Light
        } else if has("motion") {
            Self::Sensor
        } else if has("button") || has("relative_rotary") {
            Self::Switch
        } else if device
            .product_data
            .product_name
            .to_lowercase()
            .contains("bridge")
        {
            Self::Bridge
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDiagnostic {
    pub name: String,
    pub model: String,
    pub class: DeviceClass,
    /// `connected`, `disconnected`, `connectivity_issue`, or `unknown`.
    pub status: String,
    pub mac: Option<String>,
    pub battery: Option<u8>,
    pub last_seen: Option<String>,
}

impl DeviceDiagnostic {
    /// Offline, flaky, or battery at or below 20 %.
    pub fn is_critical(&self) -> bool {
        matches!(self.status.as_str(), "connectivity_issue" | "disconnected")
            || self.battery.is_some_and(|b| b <= 20)
    }
}

pub fn build_diagnostics(
    devices: &[Device],
    zigbee: &[ZigbeeConnectivity],
    power: &[DevicePower],
) -> Vec<DeviceDiagnostic> {
    let zigbee_by_owner: HashMap<&str, &ZigbeeConnectivity> =
        zigbee.iter().map(|z| (z.owner.rid.as_str(), z)).collect();
    let battery_by_owner: HashMap<&str, Option<u8>> = power
        .iter()
        .map(|p| {
            (
                p.owner.rid.as_str(),
                p.power_state.and_then(|s| s.battery_level),
            )
        })
        .collect();

    let mut out: Vec<DeviceDiagnostic> = devices
        .iter()
        .filter_map(|device| {
            let class = DeviceClass::of(device);
            let zb = zigbee_by_owner.get(device.id.as_str());
            let battery = battery_by_owner.get(device.id.as_str());

            if zb.is_none() && battery.is_none() && class != DeviceClass::Bridge {
                return None;
            }

            let status = match (zb, class) {
                (Some(z), _) => z.status.clone(),
                (None, DeviceClass::Bridge) => "connected".to_owned(),
                (None, _) => "unknown".to_owned(),
            };

            Some(DeviceDiagnostic {
                name: device.metadata.name.clone(),
                model: device.product_data.product_name.clone(),
                class,
                status,
                mac: zb.and_then(|z| z.mac_address.clone()),
                battery: battery.copied().flatten(),
                last_seen: zb.and_then(|z| z.last_seen.clone()),
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.is_critical()
            .cmp(&a.is_critical())
            .then_with(|| a.class.cmp(&b.class))
            .then_with(|| compare_names(&a.name, &b.name))
    });
    out
}

// ── Detected items ──────────────────────────────────────────────────

/// An unmapped controller name seen on the command path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedItem {
    pub name: String,
    pub id: String,
}

impl DetectedItem {
    pub fn command(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            id: format!("cmd_{name}"),
        }
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn devices() -> Vec<Device> {
        serde_json::from_value(json!([
            {
                "id": "dev-dial",
                "metadata": { "name": "Hallway" },
                "product_data": { "product_name": "Hue tap dial switch" },
                "services": [
                    { "rid": "btn-1", "rtype": "button" },
                    { "rid": "btn-2", "rtype": "button" },
                    { "rid": "rot-1", "rtype": "relative_rotary" },
                    { "rid": "pw-dial", "rtype": "device_power" }
                ]
            },
            {
                "id": "dev-motion",
                "metadata": { "name": "Garage" },
                "product_data": { "product_name": "Hue motion sensor" },
                "services": [
                    { "rid": "mot-1", "rtype": "motion" },
                    { "rid": "zb-motion", "rtype": "zigbee_connectivity" }
                ]
            },
            {
                "id": "dev-bridge",
                "metadata": { "name": "Bridge" },
                "product_data": { "product_name": "Hue Bridge" },
                "services": []
            },
            {
                "id": "dev-lamp",
                "metadata": { "name": "Attic" },
                "product_data": { "product_name": "Hue white lamp" },
                "services": [{ "rid": "light-attic", "rtype": "light" }]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn targets_cover_every_kind_sorted() {
        let lights: Vec<Light> = serde_json::from_value(json!([
            { "id": "light-attic", "metadata": { "name": "attic lamp" } }
        ]))
        .unwrap();
        let groups: Vec<Group> = serde_json::from_value(json!([
            {
                "id": "room-1",
                "type": "room",
                "metadata": { "name": "Kitchen" },
                "services": [{ "rid": "gl-1", "rtype": "grouped_light" }]
            },
            { "id": "zone-empty", "type": "zone", "metadata": { "name": "Nothing" }, "services": [] }
        ]))
        .unwrap();

        let targets = build_targets(&Catalog::default(), &lights, &groups, &devices());
        let summary: Vec<(&str, TargetKind)> =
            targets.iter().map(|t| (t.name.as_str(), t.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("attic lamp", TargetKind::Light),
                ("Garage", TargetKind::Sensor),
                ("Hallway (Button 1)", TargetKind::Button),
                ("Hallway (Button 2)", TargetKind::Button),
                ("Hallway (Dial)", TargetKind::Button),
                ("Kitchen", TargetKind::Group),
            ]
        );
        assert_eq!(targets[5].uuid, "gl-1");
    }

    #[test]
    fn scenes_resolve_lights_and_group() {
        let scenes: Vec<Scene> = serde_json::from_value(json!([
            {
                "id": "scene-b",
                "metadata": { "name": "Relax" },
                "group": { "rid": "room-1", "rtype": "room" },
                "actions": [
                    { "target": { "rid": "light-1", "rtype": "light" }, "action": { "on": { "on": true } } },
                    { "target": { "rid": "ghost", "rtype": "light" }, "action": {} }
                ],
                "speed": 0.5
            },
            { "id": "scene-a", "metadata": { "name": "Bright" }, "actions": [] }
        ]))
        .unwrap();
        let lights: Vec<Light> =
            serde_json::from_value(json!([{ "id": "light-1", "metadata": { "name": "Sofa" } }]))
                .unwrap();
        let groups: Vec<Group> = serde_json::from_value(json!([
            { "id": "room-1", "type": "room", "metadata": { "name": "Living" }, "services": [] }
        ]))
        .unwrap();

        let out = build_scenes(&scenes, &lights, &groups);
        assert_eq!(out[0].name, "Bright");
        assert_eq!(out[1].light_count(), 1);
        assert_eq!(out[1].lights[0].name, "Sofa");
        assert_eq!(
            out[1].group,
            Some(SceneGroup {
                uuid: "room-1".into(),
                name: "Living".into(),
                kind: "room".into()
            })
        );
        assert_eq!(out[1].speed, Some(0.5));
    }

    #[test]
    fn diagnostics_put_critical_first() {
        let zigbee: Vec<ZigbeeConnectivity> = serde_json::from_value(json!([
            {
                "id": "zb-motion",
                "owner": { "rid": "dev-motion", "rtype": "device" },
                "status": "connected",
                "mac_address": "00:17:88:01:00:00:00:01"
            }
        ]))
        .unwrap();
        let power: Vec<DevicePower> = serde_json::from_value(json!([
            {
                "id": "pw-dial",
                "owner": { "rid": "dev-dial", "rtype": "device" },
                "power_state": { "battery_level": 12, "battery_state": "critical" }
            }
        ]))
        .unwrap();

        let out = build_diagnostics(&devices(), &zigbee, &power);
        let names: Vec<&str> = out.iter().map(|d| d.name.as_str()).collect();
        // Attic lamp has neither zigbee nor power data and is skipped.
        assert_eq!(names, vec!["Hallway", "Bridge", "Garage"]);
        assert!(out[0].is_critical());
        assert_eq!(out[0].status, "unknown");
        assert_eq!(out[1].status, "connected");
        assert_eq!(out[2].mac.as_deref(), Some("00:17:88:01:00:00:00:01"));
    }

    #[test]
    fn detected_item_id() {
        assert_eq!(DetectedItem::command("foo").id, "cmd_foo");
    }
}
