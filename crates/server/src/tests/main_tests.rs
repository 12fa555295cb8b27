use super::*;
use std::time::Duration;

use axum::{body, body::Body, http::Request};
use client_core::{CommandSink, DocumentStore, RelayClient, StateSource};
use futures::StreamExt;
use serde_json::json;
use shared::domain::Wall;
use tokio::{net::TcpListener, time::timeout};
use tower::ServiceExt;

const TEST_BODY_LIMIT: usize = 16 * 1024;

async fn test_app() -> (Router, Arc<AppState>) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let state = Arc::new(AppState::new(ApiContext::new(storage), 32));
    (build_router(Arc::clone(&state), TEST_BODY_LIMIT), state)
}

async fn spawn_app() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let (app, _) = test_app().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn ward_map() -> MapData {
    MapData {
        date_created: "2025-10-01".to_string(),
        width: 800.0,
        height: 600.0,
        walls: vec![Wall {
            x: 0.0,
            y: 0.0,
            w: 800.0,
            h: 10.0,
        }],
    }
}

fn json_request(method: &str, uri: &str, value: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(value.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _) = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn state_routes_write_read_and_delete() {
    let (app, _) = test_app().await;

    let put = json_request("PUT", "/state?path=%2Frobot", &json!({ "battery": 64 }));
    let response = app.clone().oneshot(put).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let get_robot = Request::get("/state?path=%2Frobot%2Fbattery")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(get_robot).await.expect("response");
    assert_eq!(body_json(response).await, json!(64));

    let delete = Request::delete("/state?path=%2Frobot")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(delete).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let get_root = Request::get("/state").body(Body::empty()).expect("request");
    let response = app.oneshot(get_root).await.expect("response");
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn append_returns_generated_id_and_announces_change() {
    let (app, state) = test_app().await;
    let mut changes = state.changes.subscribe();

    let append = json_request(
        "POST",
        "/state/append?path=%2Ftasks",
        &json!({ "name": "Deliver meds", "priority": "High" }),
    );
    let response = app.clone().oneshot(append).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: AppendResponse = serde_json::from_value(body_json(response).await).expect("dto");

    assert_eq!(changes.recv().await.expect("change"), "/tasks");
    let stored = read_state(&state.api, &format!("/tasks/{}", body.id)).await;
    assert_eq!(stored["name"], "Deliver meds");
}

#[tokio::test]
async fn appending_null_is_a_bad_request() {
    let (app, _) = test_app().await;
    let append = json_request("POST", "/state/append?path=%2Ftasks", &Value::Null);
    let response = app.oneshot(append).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn map_routes_store_and_serve_documents() {
    let (app, _) = test_app().await;

    let missing = Request::get("/maps/ward-3")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(missing).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let err: ApiError = serde_json::from_value(body_json(response).await).expect("error dto");
    assert_eq!(err.code, ErrorCode::NotFound);

    let put = json_request(
        "PUT",
        "/maps/ward-3",
        &serde_json::to_value(ward_map()).expect("map json"),
    );
    let response = app.clone().oneshot(put).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let get = Request::get("/maps/ward-3")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(get).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let map: MapData = serde_json::from_value(body_json(response).await).expect("map");
    assert_eq!(map, ward_map());

    let list = Request::get("/maps").body(Body::empty()).expect("request");
    let response = app.oneshot(list).await.expect("response");
    assert_eq!(body_json(response).await, json!(["ward-3"]));
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let (app, _) = test_app().await;
    let huge = json!({ "notes": "x".repeat(TEST_BODY_LIMIT * 2) });
    let put = json_request("PUT", "/state?path=%2Ftasks", &huge);
    let response = app.oneshot(put).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn websocket_subscribers_see_initial_and_overlapping_writes() {
    let server_url = spawn_app().await;
    let client = RelayClient::new(server_url).expect("client");
    client
        .set_state("/robot", &json!({ "status": "active" }))
        .await
        .expect("seed");

    let mut robot = client.subscribe("/robot").await.expect("subscribe");
    let initial = timeout(Duration::from_secs(5), robot.next())
        .await
        .expect("initial in time")
        .expect("initial frame");
    assert_eq!(initial, json!({ "status": "active" }));

    // A write elsewhere must not produce a frame; the next frame is the command append.
    client
        .set_state("/tasks/1", &json!({ "name": "Collect vitals" }))
        .await
        .expect("unrelated write");
    let id = client
        .append("/robot/commands", json!({ "action": "pause", "timestamp": 1 }))
        .await
        .expect("append");

    let next = timeout(Duration::from_secs(5), robot.next())
        .await
        .expect("update in time")
        .expect("update frame");
    assert_eq!(next["status"], "active");
    assert_eq!(next["commands"][id.as_str()]["action"], "pause");
}

#[tokio::test]
async fn relay_client_reads_maps_over_http() {
    let server_url = spawn_app().await;
    let client = RelayClient::new(server_url).expect("client");
    let map_id = MapId::new("ward-3");

    assert!(client.fetch_map(&map_id).await.expect("fetch").is_none());
    client.put_map(&map_id, &ward_map()).await.expect("put");
    assert_eq!(
        client.fetch_map(&map_id).await.expect("fetch"),
        Some(ward_map())
    );
}
