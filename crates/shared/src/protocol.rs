use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{
    ActiveTask, CommandId, MapId, Point, Priority, QueueTaskUpdate, RobotControl,
    RobotPoseUpdate, VoiceCommand,
};

/// Robot position, planned path, active task and map reference.
pub const ROBOT_TASK_PATH: &str = "/";
/// Robot telemetry: speed, load, floor, status, battery, connectivity.
pub const ROBOT_STATUS_PATH: &str = "/robot";
pub const ROBOT_COMMANDS_PATH: &str = "/robot/commands";
pub const VOICE_COMMANDS_PATH: &str = "voiceCommands";
pub const DELIVERY_TASKS_PATH: &str = "/tasks";
pub const MAPS_COLLECTION: &str = "maps";

/// Splits a state path into its non-empty segments; `"/"` and `""` both name the root.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// One push delivered by the state source for a subscribed path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFrame {
    pub path: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendResponse {
    pub id: String,
}

/// Reads one field of a snapshot object; a missing or ill-typed field reads as `None`.
fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    object
        .get(key)
        .filter(|value| !value.is_null())
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

/// Snapshot of the robot/task channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default)]
    pub path: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<ActiveTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<MapId>,
}

impl RobotSnapshot {
    /// Returns `None` for an empty (null or non-object) snapshot. Malformed fields are
    /// defaulted one by one instead of rejecting the whole snapshot.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            position: field(object, "position"),
            path: field(object, "path").unwrap_or_default(),
            task: field(object, "task"),
            map_id: field::<String>(object, "mapId")
                .filter(|id| !id.is_empty())
                .map(MapId),
        })
    }
}

impl RobotPoseUpdate {
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            position: field(object, "position"),
            speed: field(object, "speed"),
            load: field(object, "load"),
            floor: field(object, "floor"),
            status: field(object, "status"),
            battery: field(object, "battery"),
            connected: field(object, "connected"),
        })
    }
}

impl QueueTaskUpdate {
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            name: field(object, "name"),
            priority: field::<Priority>(object, "priority"),
            time_added: field(object, "timeAdded"),
        })
    }
}

/// A voice command as stored under its generated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCommandEntry {
    pub command: String,
    pub timestamp: i64,
    #[serde(default)]
    pub sent_to_bot: bool,
}

impl VoiceCommandEntry {
    pub fn into_command(self, id: CommandId) -> VoiceCommand {
        VoiceCommand {
            id,
            command: self.command,
            timestamp: self.timestamp,
            sent_to_bot: self.sent_to_bot,
        }
    }
}

/// Flattens the keyed voice-command mapping into a list, newest first. Entries that do
/// not parse are skipped.
pub fn voice_commands_from_value(value: &Value) -> Vec<VoiceCommand> {
    let Some(object) = value.as_object() else {
        return Vec::new();
    };
    let mut commands: Vec<VoiceCommand> = object
        .iter()
        .filter_map(|(key, entry)| {
            serde_json::from_value::<VoiceCommandEntry>(entry.clone())
                .ok()
                .map(|entry| entry.into_command(CommandId::new(key.clone())))
        })
        .collect();
    commands.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    commands
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotControlCommand {
    pub action: RobotControl,
    pub timestamp: i64,
}

/// Fire-and-forget record appended to the delivery-task sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTaskRecord {
    pub name: String,
    pub priority: Priority,
    pub time_added: String,
    pub nurse_name: String,
    pub source_location: String,
    pub destination_rooms: Vec<String>,
    pub supplies: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{RobotStatus, TaskStatus};

    #[test]
    fn robot_snapshot_defaults_missing_path_to_empty() {
        let snapshot = RobotSnapshot::from_value(&json!({
            "position": { "x": 1.0, "y": 2.0 },
            "mapId": "ward-3"
        }))
        .expect("snapshot");
        assert_eq!(snapshot.position, Some(Point::new(1.0, 2.0)));
        assert!(snapshot.path.is_empty());
        assert_eq!(snapshot.map_id, Some(MapId::new("ward-3")));
        assert!(snapshot.task.is_none());
    }

    #[test]
    fn robot_snapshot_defaults_malformed_fields_individually() {
        let snapshot = RobotSnapshot::from_value(&json!({
            "position": "not a point",
            "path": [{ "x": 0, "y": 0 }, { "x": 5, "y": 5 }],
            "task": {
                "source": { "x": 0, "y": 0 },
                "destination": { "x": 9, "y": 9 },
                "status": "in-progress"
            }
        }))
        .expect("snapshot");
        assert!(snapshot.position.is_none());
        assert_eq!(snapshot.path.len(), 2);
        assert_eq!(
            snapshot.task.map(|task| task.status),
            Some(TaskStatus::InProgress)
        );
    }

    #[test]
    fn null_snapshot_is_empty() {
        assert!(RobotSnapshot::from_value(&Value::Null).is_none());
        assert!(RobotPoseUpdate::from_value(&json!(42)).is_none());
    }

    #[test]
    fn pose_update_reads_partial_fields() {
        let update = RobotPoseUpdate::from_value(&json!({
            "speed": 1.2,
            "status": "paused",
            "battery": "full"
        }))
        .expect("update");
        assert_eq!(update.speed, Some(1.2));
        assert_eq!(update.status, Some(RobotStatus::Paused));
        assert_eq!(update.battery, None);
        assert_eq!(update.floor, None);
    }

    #[test]
    fn voice_commands_are_flattened_newest_first() {
        let commands = voice_commands_from_value(&json!({
            "-a": { "command": "go to ICU", "timestamp": 10, "sentToBot": true },
            "-b": { "command": "stop", "timestamp": 30 },
            "-c": { "timestamp": 20 }
        }));
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].id, CommandId::new("-b"));
        assert!(!commands[0].sent_to_bot);
        assert_eq!(commands[1].command, "go to ICU");
        assert!(commands[1].sent_to_bot);
    }

    #[test]
    fn path_segments_ignore_slashes() {
        assert!(path_segments("/").is_empty());
        assert_eq!(path_segments("/robot/commands/"), vec!["robot", "commands"]);
        assert_eq!(path_segments("voiceCommands"), vec!["voiceCommands"]);
    }
}
