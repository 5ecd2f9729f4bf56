// CLIP v2 HTTP client
//
// Wraps `reqwest::Client` with bridge URL construction, the
// `{ errors, data }` envelope, and the bounded exponential-backoff retry
// loop every upstream call goes through.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::Error;
use crate::eventstream::{EventStream, FrameDecoder};
use crate::models::{
    Device, DevicePower, Group, Light, LightUpdate, ResourceEnvelope, ResourceIdentifier, Scene,
    SceneRecall, ZigbeeConnectivity,
};
use crate::transport::TransportConfig;

const APP_KEY_HEADER: &str = "hue-application-key";

// ── Retry policy ─────────────────────────────────────────────────────

/// Bounded exponential backoff applied to every resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Never retry. Useful for probes and tests.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the failed attempt with zero-based index `attempt`:
    /// `min(initial * multiplier^attempt, max)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one Hue bridge.
///
/// Authenticates with the static application key header and talks to
/// `/clip/v2/resource/*` and `/eventstream/clip/v2`.
pub struct HueClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl HueClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from the bridge host (IP, hostname, or full URL) and app key.
    pub fn new(
        host: &str,
        app_key: &SecretString,
        transport: &TransportConfig,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(app_key.expose_secret())
            .map_err(|e| Error::InvalidAppKey(e.to_string()))?;
        key_value.set_sensitive(true);
        headers.insert(APP_KEY_HEADER, key_value);

        let http = transport.build_client_with_headers(headers.clone())?;
        let stream_http = transport.build_stream_client(headers)?;
        let base_url = Self::normalize_base_url(host)?;

        Ok(Self {
            http,
            stream_http,
            base_url,
            retry,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            stream_http: http.clone(),
            http,
            base_url,
            retry,
        })
    }

    /// `192.168.1.2` → `https://192.168.1.2/`; full URLs keep their scheme.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let with_scheme = if raw.contains("://") {
            raw.to_owned()
        } else {
            format!("https://{raw}")
        };
        let mut url = Url::parse(&with_scheme)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resource_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self
            .base_url
            .join(&format!("clip/v2/resource/{}", path.trim_start_matches('/')))?)
    }

    pub fn event_stream_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join("eventstream/clip/v2")?)
    }

    // ── Retrying request core ────────────────────────────────────────

    /// Issue a resource request, retrying transient failures.
    ///
    /// Returns the unwrapped `data` array. Exhausted retries surface the
    /// last error; HTTP 429 is reported at warn level since the rate
    /// limiter upstream of this call is the primary defence against it.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let url = self.resource_url(path)?;
        let mut attempt: u32 = 0;

        loop {
            match self.execute::<T, B>(method.clone(), url.clone(), body).await {
                Ok(data) => {
                    if attempt > 0 {
                        info!(path, retries = attempt, "request succeeded after retry");
                    }
                    return Ok(data);
                }
                Err(e) => {
                    let exhausted = attempt + 1 >= self.retry.max_attempts;
                    if !e.is_transient() || exhausted {
                        if e.is_rate_limited() {
                            warn!(path, %method, error = %e, "bridge rate limit hit");
                        } else {
                            error!(path, %method, error = %e, "bridge request failed");
                        }
                        return Err(e);
                    }

                    let delay = self.retry.backoff(attempt);
                    warn!(
                        reason = %e.retry_reason(),
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        path,
                        "retrying bridge request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn execute<T, B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        debug!("{method} {url}");

        let mut req = self.http.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        handle_response(resp).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    async fn put<B: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Vec<ResourceIdentifier>, Error> {
        self.request(Method::PUT, path, Some(body)).await
    }

    // ── Resources ────────────────────────────────────────────────────

    pub async fn list_lights(&self) -> Result<Vec<Light>, Error> {
        self.get("light").await
    }

    pub async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        self.get("device").await
    }

    pub async fn list_rooms(&self) -> Result<Vec<Group>, Error> {
        self.get("room").await
    }

    pub async fn list_zones(&self) -> Result<Vec<Group>, Error> {
        self.get("zone").await
    }

    pub async fn list_scenes(&self) -> Result<Vec<Scene>, Error> {
        self.get("scene").await
    }

    pub async fn get_scene(&self, id: &str) -> Result<Option<Scene>, Error> {
        Ok(self.get::<Scene>(&format!("scene/{id}")).await?.into_iter().next())
    }

    pub async fn list_device_power(&self) -> Result<Vec<DevicePower>, Error> {
        self.get("device_power").await
    }

    pub async fn list_zigbee_connectivity(&self) -> Result<Vec<ZigbeeConnectivity>, Error> {
        self.get("zigbee_connectivity").await
    }

    /// `PUT /{resource_type}/{id}` where `resource_type` is `light` or
    /// `grouped_light`.
    pub async fn update_light(
        &self,
        resource_type: &str,
        id: &str,
        update: &LightUpdate,
    ) -> Result<(), Error> {
        self.put(&format!("{resource_type}/{id}"), update).await?;
        Ok(())
    }

    pub async fn recall_scene(&self, id: &str) -> Result<(), Error> {
        self.put(&format!("scene/{id}"), &SceneRecall::active()).await?;
        Ok(())
    }

    // ── Event stream ─────────────────────────────────────────────────

    /// Open the push-event feed.
    ///
    /// Fails if the connection cannot be established or the bridge answers
    /// with an error status. The returned stream yields one item per
    /// `data:` frame and ends when the bridge closes the connection.
    pub async fn open_event_stream(&self) -> Result<EventStream, Error> {
        let url = self.event_stream_url()?;
        debug!("GET {url} (event stream)");

        let resp = self
            .stream_http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| Error::EventStream(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(error_from_status(status, resp).await);
        }

        let stream = async_stream::try_stream! {
            let mut bytes = resp.bytes_stream();
            let mut decoder = FrameDecoder::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| Error::EventStream(e.to_string()))?;
                for batch in decoder.push(&chunk) {
                    yield batch;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Vec<T>, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(error_from_status(status, resp).await);
    }

    let body = resp.text().await?;
    let envelope: ResourceEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
        let preview = body.chars().take(200).collect::<String>();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })?;

    if !envelope.errors.is_empty() {
        debug!(
            errors = ?envelope.errors.iter().map(|e| e.description.as_str()).collect::<Vec<_>>(),
            "bridge reported partial errors"
        );
    }
    Ok(envelope.data)
}

async fn error_from_status(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    match status.as_u16() {
        401 | 403 => Error::Unauthorized {
            status: status.as_u16(),
        },
        429 => Error::RateLimited {
            retry_after_secs: resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
        },
        code => {
            let raw = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ResourceEnvelope<serde_json::Value>>(&raw)
                .ok()
                .filter(|env| !env.errors.is_empty())
                .map(|env| {
                    env.errors
                        .into_iter()
                        .map(|e| e.description)
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_else(|| {
                    if raw.is_empty() {
                        status.to_string()
                    } else {
                        raw
                    }
                });
            Error::Http {
                status: code,
                message,
            }
        }
    }
}
