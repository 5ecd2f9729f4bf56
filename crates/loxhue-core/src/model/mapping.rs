// ── Controller ↔ bridge mapping ──
//
// A mapping entry binds a controller-side name to one upstream resource.
// The table is supplied from outside (config file) and replaced wholesale.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::catalog::Catalog;
use crate::ratelimit::ResourceKind;

/// Sentinel uuid that makes a mapped name behave like `all`.
pub const ALL_LIGHTS_UUID: &str = "pseudo-all";

/// Names that always address every mapped light and group.
pub const ALL_LIGHTS_NAMES: [&str; 2] = ["all", "alles"];

/// What kind of upstream resource a mapping entry points at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TargetKind {
    Light,
    Group,
    Sensor,
    Button,
}

impl TargetKind {
    /// Which write endpoint (and rate-limit queue) commands go to.
    pub fn resource_kind(self) -> ResourceKind {
        match self {
            Self::Group => ResourceKind::GroupedLight,
            Self::Light | Self::Sensor | Self::Button => ResourceKind::Light,
        }
    }

    pub fn is_controllable(self) -> bool {
        matches!(self, Self::Light | Self::Group)
    }
}

/// One controller name bound to one upstream resource id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Controller-side name, stored lower-cased.
    pub name: String,
    /// Upstream resource id (light, grouped_light, motion, button, ...).
    pub uuid: String,
    pub kind: TargetKind,
    /// Echo light/group state changes to the controller.
    #[serde(default)]
    pub sync_status: bool,
}

impl MappingEntry {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into().to_lowercase(),
            uuid: uuid.into(),
            kind,
            sync_status: false,
        }
    }

    pub fn with_sync_status(mut self, sync: bool) -> Self {
        self.sync_status = sync;
        self
    }

    pub fn is_all_lights(&self) -> bool {
        self.uuid == ALL_LIGHTS_UUID
    }

    /// Sensors and buttons always report downstream; lights and groups
    /// only when they opted in.
    pub fn forwards_status(&self) -> bool {
        match self.kind {
            TargetKind::Sensor | TargetKind::Button => true,
            TargetKind::Light | TargetKind::Group => self.sync_status,
        }
    }
}

/// Controller-side names: `[A-Za-z0-9_-]{1,50}`.
pub fn is_valid_name(name: &str) -> bool {
    (1..=50).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// The full mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<MappingEntry>,
}

impl Mapping {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookup by (already lower-cased) controller name.
    pub fn find_by_name(&self, name: &str) -> Option<&MappingEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Resolve an event's service id to its mapping entry.
    ///
    /// A direct uuid match wins. Otherwise any entry whose resource lives on
    /// the same physical device matches, so a light's `zigbee_connectivity`
    /// or `device_power` service reports under the light's name.
    pub fn find_for_service(&self, service_id: &str, catalog: &Catalog) -> Option<&MappingEntry> {
        self.entries
            .iter()
            .find(|e| e.uuid == service_id)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| catalog.same_device(service_id, &e.uuid))
            })
    }

    /// Lights and groups an all-lights sequence walks over.
    pub fn controllable(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind.is_controllable() && !e.is_all_lights())
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::catalog::ServiceIdentity;

    #[test]
    fn name_validation() {
        assert!(is_valid_name("kitchen_ceiling-1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("living room"));
        assert!(!is_valid_name("über"));
        assert!(!is_valid_name(&"a".repeat(51)));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Group".parse::<TargetKind>().ok(), Some(TargetKind::Group));
        assert!("lamp".parse::<TargetKind>().is_err());
        assert_eq!(TargetKind::Button.to_string(), "button");
    }

    #[test]
    fn sibling_service_resolves_to_light_entry() {
        let mapping = Mapping::new(vec![
            MappingEntry::new("Desk", "light-1", TargetKind::Light),
            MappingEntry::new("hall_motion", "motion-1", TargetKind::Sensor),
        ]);
        let mut catalog = Catalog::default();
        for (service, kind) in [("light-1", "light"), ("power-1", "device_power")] {
            catalog.insert_service(
                service,
                ServiceIdentity {
                    device_id: "dev-1".into(),
                    device_name: "Desk lamp".into(),
                    service_kind: kind.into(),
                },
            );
        }

        assert_eq!(
            mapping.find_for_service("power-1", &catalog).map(|e| e.name.as_str()),
            Some("desk")
        );
        assert_eq!(
            mapping.find_for_service("motion-1", &catalog).map(|e| e.name.as_str()),
            Some("hall_motion")
        );
        assert!(mapping.find_for_service("other", &catalog).is_none());
    }

    #[test]
    fn forwarding_policy_by_kind() {
        assert!(MappingEntry::new("b", "x", TargetKind::Button).forwards_status());
        assert!(!MappingEntry::new("l", "x", TargetKind::Light).forwards_status());
        assert!(
            MappingEntry::new("l", "x", TargetKind::Group)
                .with_sync_status(true)
                .forwards_status()
        );
    }
}
