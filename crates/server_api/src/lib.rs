use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{MapData, MapId},
    error::{ApiError, ErrorCode},
};
use storage::Storage;
use tokio::sync::RwLock;
use tracing::info;

mod state_tree;

pub use state_tree::{paths_overlap, StateTree};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub state: Arc<RwLock<StateTree>>,
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            state: Arc::new(RwLock::new(StateTree::new())),
        }
    }
}

pub async fn read_state(ctx: &ApiContext, path: &str) -> Value {
    ctx.state.read().await.get(path)
}

pub async fn write_state(ctx: &ApiContext, path: &str, value: Value) {
    ctx.state.write().await.set(path, value);
}

pub async fn delete_state(ctx: &ApiContext, path: &str) -> bool {
    ctx.state.write().await.delete(path)
}

/// Appends `value` as a new child of `path` and returns the generated key.
pub async fn append_state(ctx: &ApiContext, path: &str, value: Value) -> Result<String, ApiError> {
    if value.is_null() {
        return Err(ApiError::new(ErrorCode::Validation, "cannot append null"));
    }
    let id = ctx.state.write().await.append(path, value);
    info!(path, %id, "appended state child");
    Ok(id)
}

pub async fn get_map(ctx: &ApiContext, map_id: &MapId) -> Result<MapData, ApiError> {
    ctx.storage
        .get_map(map_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("map '{map_id}' not found")))
}

pub async fn put_map(ctx: &ApiContext, map_id: &MapId, map: &MapData) -> Result<(), ApiError> {
    if map_id.as_str().trim().is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "map id must not be empty"));
    }
    if map.width <= 0.0 || map.height <= 0.0 {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "map width and height must be positive",
        ));
    }
    ctx.storage.put_map(map_id, map).await.map_err(internal)?;
    info!(%map_id, walls = map.walls.len(), "stored map document");
    Ok(())
}

pub async fn list_maps(ctx: &ApiContext) -> Result<Vec<MapId>, ApiError> {
    ctx.storage.list_map_ids().await.map_err(internal)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared::domain::Wall;

    use super::*;

    async fn setup() -> ApiContext {
        let storage = Storage::new("sqlite::memory:").await.expect("db");
        ApiContext::new(storage)
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

    #[tokio::test]
    async fn missing_map_is_not_found() {
        let ctx = setup().await;
        let err = get_map(&ctx, &MapId::new("ghost"))
            .await
            .expect_err("should fail");
        assert!(matches!(err.code, ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn stored_map_round_trips() {
        let ctx = setup().await;
        let map_id = MapId::new("ward-3");
        put_map(&ctx, &map_id, &ward_map()).await.expect("put");

        assert_eq!(get_map(&ctx, &map_id).await.expect("get"), ward_map());
        assert_eq!(list_maps(&ctx).await.expect("list"), vec![map_id]);
    }

    #[tokio::test]
    async fn degenerate_maps_are_rejected() {
        let ctx = setup().await;
        let flat = MapData {
            height: 0.0,
            ..ward_map()
        };
        let err = put_map(&ctx, &MapId::new("ward-3"), &flat)
            .await
            .expect_err("should fail");
        assert!(matches!(err.code, ErrorCode::Validation));
    }

    #[tokio::test]
    async fn append_rejects_null_and_stores_children() {
        let ctx = setup().await;
        let err = append_state(&ctx, "/tasks", Value::Null)
            .await
            .expect_err("should fail");
        assert!(matches!(err.code, ErrorCode::Validation));

        let id = append_state(&ctx, "/tasks", json!({ "name": "Deliver meds" }))
            .await
            .expect("append");
        assert_eq!(
            read_state(&ctx, &format!("/tasks/{id}")).await,
            json!({ "name": "Deliver meds" })
        );
    }

    #[tokio::test]
    async fn write_and_delete_state() {
        let ctx = setup().await;
        write_state(&ctx, "/robot", json!({ "battery": 80 })).await;
        assert_eq!(read_state(&ctx, "/robot/battery").await, json!(80));

        assert!(delete_state(&ctx, "/robot").await);
        assert_eq!(read_state(&ctx, "/").await, Value::Null);
    }
}
