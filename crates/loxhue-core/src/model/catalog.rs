// ── Device catalog ──
//
// Identity (service → owning device) and light capabilities, rebuilt from
// the bridge inventory and always replaced as a whole, never patched.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use loxhue_api::models::{Device, Light};
use serde::Serialize;

use crate::color::{HUE_MIREK_MAX, HUE_MIREK_MIN};

/// Which physical device a service belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub device_id: String,
    pub device_name: String,
    pub service_kind: String,
}

/// What a light can render, and its white-tuning range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub supports_color: bool,
    pub supports_color_temperature: bool,
    pub mirek_min: u16,
    pub mirek_max: u16,
}

impl Capability {
    fn from_light(light: &Light) -> Self {
        let schema = light
            .color_temperature
            .as_ref()
            .and_then(|ct| ct.mirek_schema);
        Self {
            supports_color: light.color.is_some(),
            supports_color_temperature: light.color_temperature.is_some(),
            mirek_min: schema
                .map(|s| s.mirek_minimum)
                .filter(|m| *m > 0)
                .unwrap_or(HUE_MIREK_MIN),
            mirek_max: schema
                .map(|s| s.mirek_maximum)
                .filter(|m| *m > 0)
                .unwrap_or(HUE_MIREK_MAX),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    services: HashMap<String, ServiceIdentity>,
    capabilities: HashMap<String, Capability>,
    built_at: Option<DateTime<Utc>>,
}

impl Catalog {
    pub fn from_inventory(devices: &[Device], lights: &[Light]) -> Self {
        let services = devices
            .iter()
            .flat_map(|device| {
                device.services.iter().map(move |service| {
                    (
                        service.rid.clone(),
                        ServiceIdentity {
                            device_id: device.id.clone(),
                            device_name: device.metadata.name.clone(),
                            service_kind: service.rtype.clone(),
                        },
                    )
                })
            })
            .collect();

        let capabilities = lights
            .iter()
            .map(|light| (light.id.clone(), Capability::from_light(light)))
            .collect();

        Self {
            services,
            capabilities,
            built_at: Some(Utc::now()),
        }
    }

    pub fn identity(&self, service_id: &str) -> Option<&ServiceIdentity> {
        self.services.get(service_id)
    }

    pub fn capability(&self, light_id: &str) -> Option<&Capability> {
        self.capabilities.get(light_id)
    }

    /// `true` when both services are known and hang off one device.
    pub fn same_device(&self, a: &str, b: &str) -> bool {
        match (self.services.get(a), self.services.get(b)) {
            (Some(x), Some(y)) => x.device_id == y.device_id,
            _ => false,
        }
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn light_count(&self) -> usize {
        self.capabilities.len()
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    #[cfg(test)]
    pub(crate) fn insert_service(&mut self, service_id: &str, identity: ServiceIdentity) {
        self.services.insert(service_id.to_owned(), identity);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builds_identity_and_capabilities() {
        let devices: Vec<Device> = serde_json::from_value(serde_json::json!([{
            "id": "dev-1",
            "metadata": { "name": "Desk lamp" },
            "product_data": { "product_name": "Hue go" },
            "services": [
                { "rid": "light-1", "rtype": "light" },
                { "rid": "zb-1", "rtype": "zigbee_connectivity" }
            ]
        }]))
        .unwrap();
        let lights: Vec<Light> = serde_json::from_value(serde_json::json!([
            {
                "id": "light-1",
                "metadata": { "name": "Desk" },
                "color": { "xy": { "x": 0.4, "y": 0.4 } },
                "color_temperature": {
                    "mirek": null,
                    "mirek_valid": false,
                    "mirek_schema": { "mirek_minimum": 153, "mirek_maximum": 454 }
                }
            },
            { "id": "light-2", "metadata": { "name": "Plain" } }
        ]))
        .unwrap();

        let catalog = Catalog::from_inventory(&devices, &lights);
        assert!(catalog.same_device("light-1", "zb-1"));
        assert!(!catalog.same_device("light-1", "light-2"));
        assert_eq!(catalog.identity("zb-1").unwrap().device_name, "Desk lamp");

        let desk = catalog.capability("light-1").unwrap();
        assert!(desk.supports_color && desk.supports_color_temperature);
        assert_eq!((desk.mirek_min, desk.mirek_max), (153, 454));

        let plain = catalog.capability("light-2").unwrap();
        assert!(!plain.supports_color && !plain.supports_color_temperature);
        assert_eq!((plain.mirek_min, plain.mirek_max), (153, 500));
        assert!(catalog.built_at().is_some());
    }
}
