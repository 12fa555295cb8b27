use std::{
    fmt,
    ops::{Add, AddAssign, Sub},
};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(MapId);
id_newtype!(CommandId);

/// A coordinate in map space. Also used for screen-space pointer positions and pan offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Static floor geometry for one map revision. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapData {
    #[serde(default)]
    pub date_created: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub walls: Vec<Wall>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    InProgress,
    InQueue,
}

/// Route endpoints of the delivery currently shown on the map.
///
/// Not to be confused with [`QueueTask`], which is the queue view's record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveTask {
    pub source: Point,
    pub destination: Point,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Active,
    Paused,
    Stopped,
}

impl RobotStatus {
    pub fn label(self) -> &'static str {
        match self {
            RobotStatus::Active => "active",
            RobotStatus::Paused => "paused",
            RobotStatus::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotControl {
    Pause,
    Resume,
    Stop,
}

impl RobotControl {
    pub fn resulting_status(self) -> RobotStatus {
        match self {
            RobotControl::Pause => RobotStatus::Paused,
            RobotControl::Resume => RobotStatus::Active,
            RobotControl::Stop => RobotStatus::Stopped,
        }
    }
}

/// Last known robot telemetry. Every field except `position` may be missing until the
/// robot reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotPose {
    pub position: Point,
    pub speed: Option<f64>,
    pub load: Option<f64>,
    pub floor: Option<String>,
    pub status: Option<RobotStatus>,
    pub battery: Option<f64>,
    pub connected: Option<bool>,
}

/// A partial telemetry update; absent fields leave the previous value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotPoseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RobotStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

impl RobotPose {
    pub fn merge(&mut self, update: RobotPoseUpdate) {
        if let Some(position) = update.position {
            self.position = position;
        }
        if update.speed.is_some() {
            self.speed = update.speed;
        }
        if update.load.is_some() {
            self.load = update.load;
        }
        if update.floor.is_some() {
            self.floor = update.floor;
        }
        if update.status.is_some() {
            self.status = update.status;
        }
        if update.battery.is_some() {
            self.battery = update.battery;
        }
        if update.connected.is_some() {
            self.connected = update.connected;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Sort rank: High first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

/// An entry in the delivery queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTask {
    pub id: i64,
    pub name: String,
    pub priority: Priority,
    /// ISO-8601 text; ordering compares it as a plain string.
    pub time_added: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_added: Option<String>,
}

impl QueueTask {
    pub fn merge(&mut self, update: QueueTaskUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(time_added) = update.time_added {
            self.time_added = time_added;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCommand {
    pub id: CommandId,
    pub command: String,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub sent_to_bot: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_merge_keeps_fields_absent_from_update() {
        let mut pose = RobotPose {
            speed: Some(0.6),
            floor: Some("F3".to_string()),
            ..RobotPose::default()
        };
        pose.merge(RobotPoseUpdate {
            speed: Some(1.2),
            ..RobotPoseUpdate::default()
        });
        assert_eq!(pose.speed, Some(1.2));
        assert_eq!(pose.floor.as_deref(), Some("F3"));
    }

    #[test]
    fn pose_merge_applies_zero_values() {
        let mut pose = RobotPose {
            load: Some(3.2),
            connected: Some(true),
            ..RobotPose::default()
        };
        pose.merge(RobotPoseUpdate {
            load: Some(0.0),
            connected: Some(false),
            ..RobotPoseUpdate::default()
        });
        assert_eq!(pose.load, Some(0.0));
        assert_eq!(pose.connected, Some(false));
    }

    #[test]
    fn queue_task_merge_is_field_level() {
        let mut task = QueueTask {
            id: 7,
            name: "Deliver meds".to_string(),
            priority: Priority::Medium,
            time_added: "2025-10-09 19:30".to_string(),
        };
        task.merge(QueueTaskUpdate {
            priority: Some(Priority::High),
            ..QueueTaskUpdate::default()
        });
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.name, "Deliver meds");
        assert_eq!(task.time_added, "2025-10-09 19:30");
    }

    #[test]
    fn priority_rank_puts_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }
}
