//! Turns robot/task snapshots into Scene Model writes and decides when map geometry
//! has to be fetched.

use serde_json::Value;
use shared::{
    domain::{MapData, MapId},
    protocol::RobotSnapshot,
};
use tracing::{debug, error, info, warn};

use crate::{scene::SceneModel, transport::DocumentStore};

/// A map fetch the host must run. `seq` orders overlapping fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFetchRequest {
    pub seq: u64,
    pub map_id: MapId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapFetchOutcome {
    Found(MapData),
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapFetchResult {
    pub seq: u64,
    pub map_id: MapId,
    pub outcome: MapFetchOutcome,
}

/// Runs one fetch against the document store, folding errors into the outcome.
pub async fn fetch_map(store: &dyn DocumentStore, request: MapFetchRequest) -> MapFetchResult {
    let outcome = match store.fetch_map(&request.map_id).await {
        Ok(Some(map)) => MapFetchOutcome::Found(map),
        Ok(None) => MapFetchOutcome::NotFound,
        Err(err) => MapFetchOutcome::Failed(err.to_string()),
    };
    MapFetchResult {
        seq: request.seq,
        map_id: request.map_id,
        outcome,
    }
}

#[derive(Debug)]
pub struct StateStreamAdapter {
    last_map_id: Option<MapId>,
    issued_seq: u64,
    loading: bool,
    disposed: bool,
}

impl Default for StateStreamAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStreamAdapter {
    pub fn new() -> Self {
        Self {
            last_map_id: None,
            issued_seq: 0,
            loading: true,
            disposed: false,
        }
    }

    /// True until the first snapshot has been processed.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Applies one snapshot and returns the map fetch it calls for, if any.
    ///
    /// The last seen map id is remembered here rather than read back from the scene, so
    /// a fetch that is still in flight (or that came back empty) is not issued again.
    pub fn on_snapshot(&mut self, scene: &mut SceneModel, value: &Value) -> Option<MapFetchRequest> {
        if self.disposed {
            return None;
        }
        let Some(mut snapshot) = RobotSnapshot::from_value(value) else {
            debug!("ignoring empty robot snapshot");
            return None;
        };

        let map_id = snapshot.map_id.take();
        scene.apply_snapshot(snapshot);

        let request = match map_id {
            Some(map_id) if self.last_map_id.as_ref() != Some(&map_id) => {
                self.last_map_id = Some(map_id.clone());
                self.issued_seq += 1;
                info!(%map_id, seq = self.issued_seq, "map reference changed; fetching geometry");
                Some(MapFetchRequest {
                    seq: self.issued_seq,
                    map_id,
                })
            }
            _ => None,
        };

        if self.loading {
            self.loading = false;
            debug!("first robot snapshot processed");
        }
        request
    }

    /// Installs a fetched map if it answers the latest request. Returns whether the scene
    /// changed. Not-found and failed fetches leave the current map in place.
    pub fn on_map_fetched(&mut self, scene: &mut SceneModel, result: MapFetchResult) -> bool {
        if self.disposed {
            debug!(map_id = %result.map_id, "map fetch resolved after teardown; ignoring");
            return false;
        }
        match result.outcome {
            MapFetchOutcome::Found(map) => {
                if result.seq != self.issued_seq {
                    debug!(
                        map_id = %result.map_id,
                        seq = result.seq,
                        latest = self.issued_seq,
                        "discarding superseded map fetch"
                    );
                    return false;
                }
                scene.install_map(map);
                true
            }
            MapFetchOutcome::NotFound => {
                warn!(map_id = %result.map_id, "map document not found; keeping current map");
                false
            }
            MapFetchOutcome::Failed(err) => {
                error!(map_id = %result.map_id, error = %err, "failed to fetch map document; keeping current map");
                false
            }
        }
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }
}

#[cfg(test)]
#[path = "tests/adapter_tests.rs"]
mod tests;
