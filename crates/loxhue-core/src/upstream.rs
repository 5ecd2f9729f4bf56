// ── Upstream seam ──
//
// Everything the engine asks of the bridge, as a trait so the dispatcher,
// the stream consumer and the bridge facade can run against a fake.

use async_trait::async_trait;
use loxhue_api::models::{
    Device, DevicePower, Group, Light, LightUpdate, Scene, ZigbeeConnectivity,
};
use loxhue_api::{Error, EventStream, HueClient};

use crate::model::Catalog;
use crate::ratelimit::ResourceKind;

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn update_light(
        &self,
        kind: ResourceKind,
        id: &str,
        update: &LightUpdate,
    ) -> Result<(), Error>;

    async fn list_lights(&self) -> Result<Vec<Light>, Error>;
    async fn list_devices(&self) -> Result<Vec<Device>, Error>;
    async fn list_rooms(&self) -> Result<Vec<Group>, Error>;
    async fn list_zones(&self) -> Result<Vec<Group>, Error>;
    async fn list_scenes(&self) -> Result<Vec<Scene>, Error>;
    async fn get_scene(&self, id: &str) -> Result<Option<Scene>, Error>;
    async fn recall_scene(&self, id: &str) -> Result<(), Error>;
    async fn list_device_power(&self) -> Result<Vec<DevicePower>, Error>;
    async fn list_zigbee_connectivity(&self) -> Result<Vec<ZigbeeConnectivity>, Error>;

    async fn open_event_stream(&self) -> Result<EventStream, Error>;
}

#[async_trait]
impl Upstream for HueClient {
    async fn update_light(
        &self,
        kind: ResourceKind,
        id: &str,
        update: &LightUpdate,
    ) -> Result<(), Error> {
        HueClient::update_light(self, kind.path(), id, update).await
    }

    async fn list_lights(&self) -> Result<Vec<Light>, Error> {
        HueClient::list_lights(self).await
    }

    async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        HueClient::list_devices(self).await
    }

    async fn list_rooms(&self) -> Result<Vec<Group>, Error> {
        HueClient::list_rooms(self).await
    }

    async fn list_zones(&self) -> Result<Vec<Group>, Error> {
        HueClient::list_zones(self).await
    }

    async fn list_scenes(&self) -> Result<Vec<Scene>, Error> {
        HueClient::list_scenes(self).await
    }

    async fn get_scene(&self, id: &str) -> Result<Option<Scene>, Error> {
        HueClient::get_scene(self, id).await
    }

    async fn recall_scene(&self, id: &str) -> Result<(), Error> {
        HueClient::recall_scene(self, id).await
    }

    async fn list_device_power(&self) -> Result<Vec<DevicePower>, Error> {
        HueClient::list_device_power(self).await
    }

    async fn list_zigbee_connectivity(&self) -> Result<Vec<ZigbeeConnectivity>, Error> {
        HueClient::list_zigbee_connectivity(self).await
    }

    async fn open_event_stream(&self) -> Result<EventStream, Error> {
        HueClient::open_event_stream(self).await
    }
}

/// Pull devices and lights and build a fresh catalog. The lights come back
/// too, so callers can seed state without a second request.
pub(crate) async fn fetch_catalog(upstream: &dyn Upstream) -> Result<(Catalog, Vec<Light>), Error> {
    let (devices, lights) = tokio::try_join!(upstream.list_devices(), upstream.list_lights())?;
    let catalog = Catalog::from_inventory(&devices, &lights);
    tracing::debug!(
        services = catalog.service_count(),
        lights = catalog.light_count(),
        "catalog rebuilt"
    );
    Ok((catalog, lights))
}
