use super::*;
use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode as HttpStatus,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shared::{domain::Wall, error::ErrorCode};
use tokio::{net::TcpListener, sync::Mutex, time::timeout};

#[derive(Clone, Default)]
struct RelayState {
    appended: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn get_map(Path(map_id): Path<String>) -> Response {
    if map_id == "ward-3" {
        Json(json!({
            "dateCreated": "2025-10-01",
            "width": 800.0,
            "height": 600.0,
            "walls": [{ "x": 0.0, "y": 0.0, "w": 800.0, "h": 10.0 }]
        }))
        .into_response()
    } else if map_id == "broken" {
        (
            HttpStatus::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Internal, "disk on fire")),
        )
            .into_response()
    } else {
        (HttpStatus::NOT_FOUND, Json(ApiError::not_found("map not found"))).into_response()
    }
}

async fn append(
    State(state): State<RelayState>,
    Query(query): Query<HashMap<String, String>>,
    Json(value): Json<Value>,
) -> Json<AppendResponse> {
    let path = query.get("path").cloned().unwrap_or_default();
    let mut appended = state.appended.lock().await;
    appended.push((path, value));
    Json(AppendResponse {
        id: format!("cmd-{}", appended.len()),
    })
}

async fn ws_state(ws: WebSocketUpgrade, Query(query): Query<HashMap<String, String>>) -> Response {
    let path = query.get("path").cloned().unwrap_or_default();
    ws.on_upgrade(move |socket| push_frames(socket, path))
}

async fn push_frames(mut socket: WebSocket, path: String) {
    for x in [10.0, 20.0] {
        let frame = StateFrame {
            path: path.clone(),
            value: json!({ "position": { "x": x, "y": 5.0 }, "mapId": "ward-3" }),
        };
        let Ok(text) = serde_json::to_string(&frame) else {
            return;
        };
        if socket.send(WsMessage::Text(text)).await.is_err() {
            return;
        }
    }
    let _ = socket.send(WsMessage::Close(None)).await;
}

async fn spawn_relay() -> (String, RelayState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = RelayState::default();
    let app = Router::new()
        .route("/maps/:map_id", get(get_map))
        .route("/state/append", post(append))
        .route("/ws/state", get(ws_state))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

#[test]
fn rejects_non_http_server_urls() {
    assert!(matches!(
        RelayClient::new("ftp://relay"),
        Err(ClientError::InvalidServerUrl(_))
    ));
    let client = RelayClient::new("https://relay.example/").expect("client");
    assert_eq!(client.server_url(), "https://relay.example");
}

#[test]
fn websocket_url_carries_the_state_path() {
    let client = RelayClient::new("https://relay.example").expect("client");
    let url = client.ws_url("/robot").expect("ws url");
    assert_eq!(url.as_str(), "wss://relay.example/ws/state?path=%2Frobot");
}

#[tokio::test]
async fn fetch_map_reads_documents_and_maps_404_to_none() {
    let (server_url, _) = spawn_relay().await;
    let client = RelayClient::new(server_url).expect("client");

    let map = client
        .fetch_map(&MapId::new("ward-3"))
        .await
        .expect("fetch")
        .expect("map present");
    assert_eq!(map.width, 800.0);
    assert_eq!(
        map.walls,
        vec![Wall {
            x: 0.0,
            y: 0.0,
            w: 800.0,
            h: 10.0
        }]
    );

    let missing = client.fetch_map(&MapId::new("ghost")).await.expect("fetch");
    assert!(missing.is_none());
}

#[tokio::test]
async fn fetch_map_surfaces_server_errors() {
    let (server_url, _) = spawn_relay().await;
    let client = RelayClient::new(server_url).expect("client");

    let err = client
        .fetch_map(&MapId::new("broken"))
        .await
        .expect_err("server error");
    match err {
        ClientError::Api(api_error) => assert_eq!(api_error.code, ErrorCode::Internal),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn append_posts_value_under_path_and_returns_generated_id() {
    let (server_url, state) = spawn_relay().await;
    let client = RelayClient::new(server_url).expect("client");

    let id = client
        .append("/robot/commands", json!({ "action": "pause", "timestamp": 1 }))
        .await
        .expect("append");

    assert_eq!(id, "cmd-1");
    let appended = state.appended.lock().await;
    assert_eq!(appended[0].0, "/robot/commands");
    assert_eq!(appended[0].1["action"], "pause");
}

#[tokio::test]
async fn subscription_yields_pushed_values_in_order() {
    let (server_url, _) = spawn_relay().await;
    let client = RelayClient::new(server_url).expect("client");

    let mut subscription = client.subscribe("/").await.expect("subscribe");
    assert_eq!(subscription.path(), "/");

    let first = timeout(Duration::from_secs(5), subscription.next())
        .await
        .expect("first frame in time")
        .expect("first frame");
    let second = timeout(Duration::from_secs(5), subscription.next())
        .await
        .expect("second frame in time")
        .expect("second frame");
    assert_eq!(first["position"]["x"], 10.0);
    assert_eq!(second["position"]["x"], 20.0);

    let end = timeout(Duration::from_secs(5), subscription.next())
        .await
        .expect("stream closes");
    assert!(end.is_none());
}

#[tokio::test]
async fn channel_subscription_ends_when_sender_drops() {
    let (tx, mut subscription) = Subscription::channel("/robot");
    tx.send(json!({ "speed": 1.0 })).await.expect("send");
    drop(tx);

    assert_eq!(subscription.next().await, Some(json!({ "speed": 1.0 })));
    assert_eq!(subscription.next().await, None);
}

#[tokio::test]
async fn unsubscribe_stops_the_reader_task() {
    let (_tx, rx) = mpsc::channel::<Value>(1);
    let reader = tokio::spawn(async {
        tokio::time::sleep(Duration::from_secs(60)).await;
    });
    let abort = reader.abort_handle();
    let subscription = Subscription::new("/", rx, Some(reader));

    subscription.unsubscribe();
    tokio::task::yield_now().await;
    timeout(Duration::from_secs(1), async {
        while !abort.is_finished() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("reader aborted");
}
