use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ws::WebSocket, Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use server_api::{
    append_state, delete_state, get_map, list_maps, paths_overlap, put_map, read_state,
    write_state, ApiContext,
};
use shared::{
    domain::{MapData, MapId},
    error::{ApiError, ErrorCode},
    protocol::{AppendResponse, StateFrame},
};
use storage::Storage;
use tokio::sync::broadcast::error::RecvError;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info, warn};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, log_filter, prepare_database_url};

type RouteError = (StatusCode, Json<ApiError>);

#[derive(Debug, Deserialize)]
struct PathQuery {
    #[serde(default = "root_path")]
    path: String,
}

fn root_path() -> String {
    "/".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let state = AppState::new(ApiContext::new(storage), settings.change_buffer);
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "relay listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/state",
            get(http_get_state).put(http_put_state).delete(http_delete_state),
        )
        .route("/state/append", post(http_append_state))
        .route("/maps", get(http_list_maps))
        .route("/maps/:map_id", get(http_get_map).put(http_put_map))
        .route("/ws/state", get(ws_handler))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, RouteError> {
    state
        .api
        .storage
        .health_check()
        .await
        .map_err(|e| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError::new(ErrorCode::Internal, e.to_string())),
            )
        })?;
    Ok("ok")
}

fn status_for(err: &ApiError) -> StatusCode {
    match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn route_error(err: ApiError) -> RouteError {
    (status_for(&err), Json(err))
}

async fn http_get_state(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
) -> Json<Value> {
    Json(read_state(&state.api, &q.path).await)
}

async fn http_put_state(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
    Json(value): Json<Value>,
) -> StatusCode {
    write_state(&state.api, &q.path, value).await;
    state.notify_changed(&q.path);
    StatusCode::NO_CONTENT
}

async fn http_delete_state(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
) -> StatusCode {
    if delete_state(&state.api, &q.path).await {
        state.notify_changed(&q.path);
    }
    StatusCode::NO_CONTENT
}

async fn http_append_state(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
    Json(value): Json<Value>,
) -> Result<Json<AppendResponse>, RouteError> {
    let id = append_state(&state.api, &q.path, value)
        .await
        .map_err(route_error)?;
    state.notify_changed(&q.path);
    Ok(Json(AppendResponse { id }))
}

async fn http_list_maps(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MapId>>, RouteError> {
    list_maps(&state.api).await.map(Json).map_err(route_error)
}

async fn http_get_map(
    State(state): State<Arc<AppState>>,
    Path(map_id): Path<String>,
) -> Result<Json<MapData>, RouteError> {
    get_map(&state.api, &MapId(map_id))
        .await
        .map(Json)
        .map_err(route_error)
}

async fn http_put_map(
    State(state): State<Arc<AppState>>,
    Path(map_id): Path<String>,
    Json(map): Json<MapData>,
) -> Result<StatusCode, RouteError> {
    put_map(&state.api, &MapId(map_id), &map)
        .await
        .map_err(route_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket, q.path))
}

/// Pushes the value at `path` once on connect and again after every overlapping write.
async fn ws_connection(state: Arc<AppState>, socket: WebSocket, path: String) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the first read so no write can fall between the two.
    let mut changes_rx = state.changes.subscribe();
    debug!(%path, "state subscriber connected");

    let send_task = tokio::spawn(async move {
        let mut pending = true;
        loop {
            if pending {
                let frame = StateFrame {
                    path: path.clone(),
                    value: read_state(&state.api, &path).await,
                };
                match serde_json::to_string(&frame) {
                    Ok(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(%path, error = %err, "failed to encode state frame"),
                }
            }
            pending = match changes_rx.recv().await {
                Ok(changed) => paths_overlap(&changed, &path),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%path, skipped, "state subscriber lagged; resending current value");
                    true
                }
                Err(RecvError::Closed) => break,
            };
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
