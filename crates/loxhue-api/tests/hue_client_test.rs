#![allow(clippy::unwrap_used)]
// Integration tests for `HueClient` using wiremock.

use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use loxhue_api::models::{DimmingUpdate, EventKind, LightUpdate, OnState};
use loxhue_api::{Error, HueClient, RetryPolicy, TlsMode, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        multiplier: 2,
        max_backoff: Duration::from_millis(5),
    }
}

async fn setup(retry: RetryPolicy) -> (MockServer, HueClient) {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        tls: TlsMode::System,
        timeout: Duration::from_secs(2),
    };
    let key: secrecy::SecretString = "test-app-key".to_string().into();
    let client = HueClient::new(&server.uri(), &key, &transport, retry).unwrap();
    (server, client)
}

fn resource_path(suffix: &str) -> String {
    format!("/clip/v2/resource/{suffix}")
}

// ── Resource reads ──────────────────────────────────────────────────

#[tokio::test]
async fn test_list_lights_sends_app_key() {
    let (server, client) = setup(fast_retry(3)).await;

    Mock::given(method("GET"))
        .and(path(resource_path("light")))
        .and(header("hue-application-key", "test-app-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "data": [{
                "id": "light-1",
                "owner": { "rid": "dev-1", "rtype": "device" },
                "metadata": { "name": "Kitchen" },
                "on": { "on": false },
                "dimming": { "brightness": 40.0 },
                "color": { "xy": { "x": 0.3, "y": 0.3 } }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lights = client.list_lights().await.unwrap();
    assert_eq!(lights.len(), 1);
    assert_eq!(lights[0].metadata.name, "Kitchen");
    assert!(lights[0].color.is_some());
}

#[tokio::test]
async fn test_get_scene_missing_is_not_found() {
    let (server, client) = setup(fast_retry(3)).await;

    Mock::given(method("GET"))
        .and(path(resource_path("scene/3f1c1b2e-0000-4000-8000-000000000000")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{ "description": "Not Found" }],
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .get_scene("3f1c1b2e-0000-4000-8000-000000000000")
        .await;
    match result {
        Err(e) => {
            assert!(e.is_not_found(), "expected 404, got: {e:?}");
            assert!(e.to_string().contains("Not Found"));
        }
        Ok(scene) => panic!("expected error, got {scene:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup(fast_retry(1)).await;

    Mock::given(method("GET"))
        .and(path(resource_path("room")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let result = client.list_rooms().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Retry behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn test_503_is_retried_up_to_max_attempts() {
    let (server, client) = setup(fast_retry(3)).await;

    Mock::given(method("GET"))
        .and(path(resource_path("device")))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let result = client.list_devices().await;
    assert_eq!(result.unwrap_err().status(), Some(503));
}

#[tokio::test]
async fn test_timeout_is_retried_up_to_max_attempts() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        tls: TlsMode::System,
        timeout: Duration::from_millis(100),
    };
    let key: secrecy::SecretString = "test-app-key".to_string().into();
    let client = HueClient::new(&server.uri(), &key, &transport, fast_retry(3)).unwrap();

    Mock::given(method("GET"))
        .and(path(resource_path("light")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "errors": [], "data": [] }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let err = client.list_lights().await.unwrap_err();
    assert!(
        matches!(&err, Error::Transport(e) if e.is_timeout()),
        "expected a timeout, got {err:?}"
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_404_is_not_retried() {
    let (server, client) = setup(fast_retry(5)).await;

    Mock::given(method("PUT"))
        .and(path(resource_path("light/gone")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .update_light("light", "gone", &LightUpdate::off())
        .await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let (server, client) = setup(fast_retry(3)).await;

    Mock::given(method("GET"))
        .and(path(resource_path("zone")))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(resource_path("zone")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errors": [], "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.list_zones().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_429_maps_to_rate_limited() {
    let (server, client) = setup(fast_retry(1)).await;

    Mock::given(method("PUT"))
        .and(path(resource_path("grouped_light/g1")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .mount(&server)
        .await;

    let result = client
        .update_light("grouped_light", "g1", &LightUpdate::off())
        .await;
    assert!(
        matches!(
            result,
            Err(Error::RateLimited {
                retry_after_secs: Some(2)
            })
        ),
        "expected RateLimited, got: {result:?}"
    );
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_light_body() {
    let (server, client) = setup(fast_retry(1)).await;

    Mock::given(method("PUT"))
        .and(path(resource_path("light/l1")))
        .and(body_json(json!({ "on": { "on": true }, "dimming": { "brightness": 55 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "data": [{ "rid": "l1", "rtype": "light" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = LightUpdate {
        on: Some(OnState { on: true }),
        dimming: Some(DimmingUpdate { brightness: 55 }),
        ..LightUpdate::default()
    };
    client.update_light("light", "l1", &update).await.unwrap();
}

#[tokio::test]
async fn test_recall_scene_body() {
    let (server, client) = setup(fast_retry(1)).await;

    Mock::given(method("PUT"))
        .and(path(resource_path("scene/s1")))
        .and(body_json(json!({ "recall": { "action": "active" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errors": [], "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    client.recall_scene("s1").await.unwrap();
}

// ── Event stream ────────────────────────────────────────────────────

#[tokio::test]
async fn test_event_stream_yields_frames_then_ends() {
    let (server, client) = setup(fast_retry(1)).await;

    let body = concat!(
        ": hi\n\n",
        "id: 1:0\n",
        "data: [{\"type\":\"update\",\"data\":[{\"id\":\"m1\",\"type\":\"motion\",\"motion\":{\"motion\":true}}]}]\n\n",
        "data: garbage\n\n",
        "data: [{\"type\":\"delete\",\"data\":[{\"id\":\"x\"}]}]\n\n",
    );

    Mock::given(method("GET"))
        .and(path("/eventstream/clip/v2"))
        .and(header("accept", "text/event-stream"))
        .and(header("hue-application-key", "test-app-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let mut stream = client.open_event_stream().await.unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first[0].kind, EventKind::Update);
    assert_eq!(
        first[0].data[0].motion.and_then(|m| m.motion),
        Some(true)
    );

    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second[0].kind, EventKind::Delete);

    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_event_stream_rejected_key() {
    let (server, client) = setup(fast_retry(1)).await;

    Mock::given(method("GET"))
        .and(path("/eventstream/clip/v2"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = client.open_event_stream().await;
    assert!(matches!(result, Err(Error::Unauthorized { status: 403 })));
}
