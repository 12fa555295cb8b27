use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{DocumentStore, MapView, RelayClient, Renderer, StateSource};
use serde_json::{json, Value};
use shared::{
    domain::{ActiveTask, MapData, MapId, Point, RobotStatus, TaskStatus},
    protocol::{ROBOT_STATUS_PATH, ROBOT_TASK_PATH},
};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/relay.db")]
    database_url: String,
    #[arg(long, default_value = "http://127.0.0.1:8443")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stores a floor map JSON document in the relay database.
    SeedMap {
        #[arg(long)]
        map_id: String,
        #[arg(long)]
        file: PathBuf,
    },
    ListMaps,
    DeleteMap {
        #[arg(long)]
        map_id: String,
    },
    /// Replaces a node in the live state tree.
    SetState {
        #[arg(long)]
        path: String,
        #[arg(long)]
        json: String,
    },
    /// Walks a fake robot along a straight delivery route.
    Simulate {
        #[arg(long)]
        map_id: String,
        #[arg(long, default_value_t = 40)]
        steps: usize,
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Prints scene changes seen by a map view attached to the relay.
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::SeedMap { map_id, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let map: MapData = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a map document", file.display()))?;
            let storage = Storage::new(&cli.database_url).await?;
            storage.put_map(&MapId(map_id.clone()), &map).await?;
            println!("stored map_id={map_id} walls={}", map.walls.len());
        }
        Command::ListMaps => {
            let storage = Storage::new(&cli.database_url).await?;
            for map_id in storage.list_map_ids().await? {
                println!("{map_id}");
            }
        }
        Command::DeleteMap { map_id } => {
            let storage = Storage::new(&cli.database_url).await?;
            let removed = storage.delete_map(&MapId(map_id.clone())).await?;
            println!("map_id={map_id} removed={removed}");
        }
        Command::SetState { path, json } => {
            let value: Value = serde_json::from_str(&json).context("--json is not valid JSON")?;
            let relay = RelayClient::new(cli.server_url)?;
            relay.set_state(&path, &value).await?;
            println!("wrote {path}");
        }
        Command::Simulate {
            map_id,
            steps,
            interval_ms,
        } => {
            let relay = RelayClient::new(cli.server_url)?;
            simulate(&relay, &MapId(map_id), steps, Duration::from_millis(interval_ms)).await?;
        }
        Command::Watch => {
            let relay = Arc::new(RelayClient::new(cli.server_url)?);
            let subscription = relay.subscribe(ROBOT_TASK_PATH).await?;
            let store: Arc<dyn DocumentStore> = relay;
            let mut view = MapView::new(Renderer::default());
            view.drive(subscription, store, |view| {
                let scene = view.scene();
                let position = scene
                    .position()
                    .map_or_else(|| "-".to_string(), |p| format!("({:.0}, {:.0})", p.x, p.y));
                println!(
                    "rev={} position={position} path={} map_loaded={}",
                    scene.revision(),
                    scene.path().len(),
                    scene.is_drawable()
                );
            })
            .await;
        }
    }

    Ok(())
}

fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn route(source: Point, destination: Point, steps: usize) -> Vec<Point> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            Point::new(
                source.x + (destination.x - source.x) * t,
                source.y + (destination.y - source.y) * t,
            )
        })
        .collect()
}

fn battery_at(step: usize, total: usize) -> f64 {
    let drained = 30.0 * step as f64 / total.max(1) as f64;
    (95.0 - drained).round()
}

async fn simulate(relay: &RelayClient, map_id: &MapId, steps: usize, interval: Duration) -> Result<()> {
    let task = ActiveTask {
        source: Point::new(120.0, 80.0),
        destination: Point::new(640.0, 420.0),
        status: TaskStatus::InProgress,
    };
    let waypoints = route(task.source, task.destination, steps);

    relay.set_state("/mapId", &json!(map_id.as_str())).await?;
    relay.set_state("/task", &serde_json::to_value(task)?).await?;
    relay
        .set_state(
            ROBOT_STATUS_PATH,
            &json!({
                "status": RobotStatus::Active,
                "floor": "3",
                "load": 1,
                "speed": 0.8,
                "connected": true,
                "battery": battery_at(0, steps),
            }),
        )
        .await?;
    info!(%map_id, waypoints = waypoints.len(), "simulation started");

    let mut ticker = tokio::time::interval(interval);
    for (step, position) in waypoints.iter().enumerate() {
        ticker.tick().await;
        relay.set_state("/position", &serde_json::to_value(position)?).await?;
        relay
            .set_state("/path", &serde_json::to_value(&waypoints[..=step])?)
            .await?;
        relay
            .set_state(&format!("{ROBOT_STATUS_PATH}/battery"), &json!(battery_at(step, steps)))
            .await?;
    }

    relay
        .set_state(&format!("{ROBOT_STATUS_PATH}/speed"), &json!(0))
        .await?;
    info!(%map_id, "simulation finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_runs_from_source_to_destination() {
        let points = route(Point::new(0.0, 0.0), Point::new(100.0, 50.0), 4);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], Point::new(0.0, 0.0));
        assert_eq!(points[2], Point::new(50.0, 25.0));
        assert_eq!(points[4], Point::new(100.0, 50.0));
    }

    #[test]
    fn zero_steps_still_reaches_destination() {
        let points = route(Point::new(1.0, 1.0), Point::new(2.0, 2.0), 0);
        assert_eq!(points, vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)]);
    }

    #[test]
    fn battery_drains_over_the_route() {
        assert_eq!(battery_at(0, 40), 95.0);
        assert_eq!(battery_at(40, 40), 65.0);
        assert!(battery_at(10, 40) > battery_at(30, 40));
    }

    #[test]
    fn rust_log_overrides_default_filter() {
        assert_eq!(log_filter(Some("tools=debug")).to_string(), "tools=debug");
        assert_eq!(log_filter(None).to_string(), "info");
    }

    #[test]
    fn cli_parses_simulate_defaults() {
        let cli = Cli::parse_from(["tools", "simulate", "--map-id", "ward-3"]);
        match cli.command {
            Command::Simulate {
                map_id,
                steps,
                interval_ms,
            } => {
                assert_eq!(map_id, "ward-3");
                assert_eq!(steps, 40);
                assert_eq!(interval_ms, 500);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
