// ── Status reconciler ──
//
// Last-known value per controller name and attribute. Level attributes are
// forwarded only when they change; event attributes (button, rotary) are
// forwarded on every occurrence. Whether anything is forwarded at all is
// decided by the mapping entry (sensors/buttons always, lights opt-in).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::model::{Attribute, MappingEntry, StatusValue};
use crate::udp::{Category, DownstreamSink};

/// What `StatusCache::update` did with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Same as the cached level value; nothing happened.
    Unchanged,
    /// Cached, but this entry does not report downstream.
    Cached,
    /// Cached and handed to the sink.
    Forwarded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusStats {
    pub devices: usize,
    pub names: Vec<String>,
}

pub struct StatusCache {
    entries: DashMap<String, HashMap<Attribute, StatusValue>>,
    sink: Arc<dyn DownstreamSink>,
}

impl StatusCache {
    pub fn new(sink: Arc<dyn DownstreamSink>) -> Self {
        Self {
            entries: DashMap::new(),
            sink,
        }
    }

    /// Record `value` for `attribute` of `name` and forward it if due.
    pub fn update(
        &self,
        name: &str,
        attribute: Attribute,
        value: impl Into<StatusValue>,
        entry: &MappingEntry,
    ) -> UpdateOutcome {
        let value = value.into();
        {
            let mut device = self.entries.entry(name.to_owned()).or_default();
            if !attribute.is_event() && device.get(&attribute) == Some(&value) {
                trace!(name, %attribute, %value, "status unchanged");
                return UpdateOutcome::Unchanged;
            }
            device.insert(attribute, value.clone());
        }

        if !entry.forwards_status() {
            return UpdateOutcome::Cached;
        }

        let category = Category::from(entry.kind);
        // Downstream failures are counted by the sink and otherwise ignored.
        if let Err(e) = self.sink.send(name, attribute, &value, category) {
            debug!(%category, name, %attribute, error = %e, "status echo dropped");
        }
        UpdateOutcome::Forwarded
    }

    pub fn get(&self, name: &str) -> HashMap<Attribute, StatusValue> {
        self.entries
            .get(name)
            .map(|d| d.value().clone())
            .unwrap_or_default()
    }

    /// Every cached value, ordered by name and attribute.
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<Attribute, StatusValue>> {
        self.entries
            .iter()
            .map(|d| {
                (
                    d.key().clone(),
                    d.value()
                        .iter()
                        .map(|(a, v)| (*a, v.clone()))
                        .collect(),
                )
            })
            .collect()
    }

    pub fn clear(&self, name: &str) {
        self.entries.remove(name);
    }

    pub fn clear_all(&self) {
        self.entries.clear();
        debug!(category = %Category::System, "status cache cleared");
    }

    /// Drop every name not in `valid`. Returns how many were removed.
    pub fn cleanup(&self, valid: &[String]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|name, _| valid.iter().any(|v| v == name));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(category = %Category::System, removed, "cleaned up stale status entries");
        }
        removed
    }

    pub fn stats(&self) -> StatusStats {
        let mut names: Vec<String> = self.entries.iter().map(|d| d.key().clone()).collect();
        names.sort();
        StatusStats {
            devices: names.len(),
            names,
        }
    }

    pub fn sink_stats(&self) -> crate::udp::SinkStats {
        self.sink.stats()
    }
}
