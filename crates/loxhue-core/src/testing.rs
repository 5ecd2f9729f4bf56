// Test doubles for the upstream bridge and the downstream sink.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use loxhue_api::models::{
    Device, DevicePower, EventEntry, Group, Light, LightUpdate, Scene, ZigbeeConnectivity,
};
use loxhue_api::{Error, EventStream};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::CoreError;
use crate::model::{Attribute, StatusValue};
use crate::ratelimit::ResourceKind;
use crate::udp::{Category, DownstreamSink, SinkStats, render};
use crate::upstream::Upstream;

// ── Sink ─────────────────────────────────────────────────────────────

/// Records every datagram it would have sent, rendered with namespace `hue`.
#[derive(Default)]
pub(crate) struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl DownstreamSink for RecordingSink {
    fn send(
        &self,
        name: &str,
        attribute: Attribute,
        value: &StatusValue,
        _category: Category,
    ) -> Result<(), CoreError> {
        self.messages
            .lock()
            .unwrap()
            .push(render("hue", name, attribute, value));
        Ok(())
    }

    fn stats(&self) -> SinkStats {
        SinkStats {
            success_count: u64::try_from(self.messages.lock().unwrap().len()).unwrap(),
            ..SinkStats::default()
        }
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

pub(crate) fn color_light(id: &str, name: &str) -> Light {
    decode(json!({
        "id": id,
        "metadata": { "name": name },
        "on": { "on": true },
        "dimming": { "brightness": 80.0 },
        "color": { "xy": { "x": 0.3, "y": 0.3 } },
        "color_temperature": {
            "mirek": 300,
            "mirek_schema": { "mirek_minimum": 153, "mirek_maximum": 500 }
        }
    }))
}

pub(crate) fn device(id: &str, name: &str, services: &[(&str, &str)]) -> Device {
    let services: Vec<Value> = services
        .iter()
        .map(|(rid, rtype)| json!({ "rid": rid, "rtype": rtype }))
        .collect();
    decode(json!({
        "id": id,
        "metadata": { "name": name },
        "product_data": { "product_name": "Hue bulb", "model_id": "LCA001" },
        "services": services
    }))
}

pub(crate) fn scene(id: &str, name: &str, lights: &[&str]) -> Scene {
    let actions: Vec<Value> = lights
        .iter()
        .map(|rid| json!({ "target": { "rid": rid, "rtype": "light" }, "action": {} }))
        .collect();
    decode(json!({
        "id": id,
        "metadata": { "name": name },
        "actions": actions
    }))
}

// ── Upstream ─────────────────────────────────────────────────────────

/// One write as the fake bridge saw it.
#[derive(Debug, Clone)]
pub(crate) struct RecordedUpdate {
    pub kind: ResourceKind,
    pub id: String,
    pub update: LightUpdate,
    pub at: Instant,
}

/// How the next `open_event_stream` call behaves.
pub(crate) enum StreamPlan {
    Fail(Error),
    Events(mpsc::UnboundedReceiver<Result<Vec<EventEntry>, Error>>),
}

#[derive(Default)]
pub(crate) struct FakeUpstream {
    pub lights: Mutex<Vec<Light>>,
    pub devices: Mutex<Vec<Device>>,
    pub rooms: Mutex<Vec<Group>>,
    pub zones: Mutex<Vec<Group>>,
    pub scenes: Mutex<Vec<Scene>>,
    pub power: Mutex<Vec<DevicePower>>,
    pub zigbee: Mutex<Vec<ZigbeeConnectivity>>,

    /// Simulated latency of every write.
    pub update_delay: Mutex<Duration>,
    /// Light ids whose writes fail with a 500.
    pub failing: Mutex<Vec<String>>,

    updates: Mutex<Vec<RecordedUpdate>>,
    recalled: Mutex<Vec<String>>,
    in_flight: Mutex<HashMap<String, usize>>,
    max_in_flight: AtomicUsize,

    streams: Mutex<VecDeque<StreamPlan>>,
    opens: Mutex<Vec<Instant>>,
}

impl FakeUpstream {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        let fake = Self::default();
        *fake.update_delay.lock().unwrap() = delay;
        fake
    }

    pub(crate) fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub(crate) fn updates_for(&self, id: &str) -> Vec<LightUpdate> {
        self.updates()
            .into_iter()
            .filter(|u| u.id == id)
            .map(|u| u.update)
            .collect()
    }

    pub(crate) fn recalled(&self) -> Vec<String> {
        self.recalled.lock().unwrap().clone()
    }

    /// Highest number of simultaneous writes seen for any single id.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Queue a stream that yields whatever is sent on the returned channel.
    pub(crate) fn push_stream(&self) -> mpsc::UnboundedSender<Result<Vec<EventEntry>, Error>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.lock().unwrap().push_back(StreamPlan::Events(rx));
        tx
    }

    pub(crate) fn push_stream_failure(&self, error: Error) {
        self.streams.lock().unwrap().push_back(StreamPlan::Fail(error));
    }

    pub(crate) fn stream_opens(&self) -> Vec<Instant> {
        self.opens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn update_light(
        &self,
        kind: ResourceKind,
        id: &str,
        update: &LightUpdate,
    ) -> Result<(), Error> {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let count = in_flight.entry(id.to_owned()).or_default();
            *count += 1;
            self.max_in_flight.fetch_max(*count, Ordering::SeqCst);
        }
        self.updates.lock().unwrap().push(RecordedUpdate {
            kind,
            id: id.to_owned(),
            update: update.clone(),
            at: Instant::now(),
        });

        let delay = *self.update_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(count) = self.in_flight.lock().unwrap().get_mut(id) {
            *count -= 1;
        }
        if self.failing.lock().unwrap().iter().any(|f| f == id) {
            return Err(Error::Http {
                status: 500,
                message: "internal error".into(),
            });
        }
        Ok(())
    }

    async fn list_lights(&self) -> Result<Vec<Light>, Error> {
        Ok(self.lights.lock().unwrap().clone())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn list_rooms(&self) -> Result<Vec<Group>, Error> {
        Ok(self.rooms.lock().unwrap().clone())
    }

    async fn list_zones(&self) -> Result<Vec<Group>, Error> {
        Ok(self.zones.lock().unwrap().clone())
    }

    async fn list_scenes(&self) -> Result<Vec<Scene>, Error> {
        Ok(self.scenes.lock().unwrap().clone())
    }

    async fn get_scene(&self, id: &str) -> Result<Option<Scene>, Error> {
        Ok(self
            .scenes
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn recall_scene(&self, id: &str) -> Result<(), Error> {
        if !self.scenes.lock().unwrap().iter().any(|s| s.id == id) {
            return Err(Error::Http {
                status: 404,
                message: "not found".into(),
            });
        }
        self.recalled.lock().unwrap().push(id.to_owned());
        Ok(())
    }

    async fn list_device_power(&self) -> Result<Vec<DevicePower>, Error> {
        Ok(self.power.lock().unwrap().clone())
    }

    async fn list_zigbee_connectivity(&self) -> Result<Vec<ZigbeeConnectivity>, Error> {
        Ok(self.zigbee.lock().unwrap().clone())
    }

    async fn open_event_stream(&self) -> Result<EventStream, Error> {
        self.opens.lock().unwrap().push(Instant::now());
        let plan = self.streams.lock().unwrap().pop_front();
        match plan {
            Some(StreamPlan::Events(rx)) => Ok(futures_util::stream::unfold(rx, |mut rx| async {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
            Some(StreamPlan::Fail(e)) => Err(e),
            None => Err(Error::EventStream("no stream scripted".into())),
        }
    }
}
