use shared::domain::{MapData, MapId, Wall};
use storage::{cache_get_json, cache_put_json, LocalCache, Storage};

#[tokio::test]
async fn map_documents_and_cache_survive_reopen() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("dashboard.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let map_id = MapId::new("ward-3");
    let map = MapData {
        date_created: "2025-10-01".to_string(),
        width: 640.0,
        height: 480.0,
        walls: vec![Wall {
            x: 0.0,
            y: 0.0,
            w: 640.0,
            h: 10.0,
        }],
    };

    {
        let storage = Storage::new(&database_url).await.expect("db");
        storage.put_map(&map_id, &map).await.expect("put map");
        cache_put_json(&storage, "voiceCommands", &vec!["go to pharmacy"])
            .await
            .expect("put cache");
        storage.pool().close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(reopened.get_map(&map_id).await.expect("get map"), Some(map));
    let cache: &dyn LocalCache = &reopened;
    let commands: Option<Vec<String>> = cache_get_json(cache, "voiceCommands")
        .await
        .expect("get cache");
    assert_eq!(commands, Some(vec!["go to pharmacy".to_string()]));
}
