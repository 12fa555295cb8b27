use serde_json::Value;
use shared::{
    domain::{RobotControl, RobotPose, RobotPoseUpdate, RobotStatus},
    protocol::RobotControlCommand,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryBand {
    Green,
    Yellow,
    Orange,
    Red,
}

impl BatteryBand {
    pub fn from_level(level: f64) -> Self {
        if level >= 71.0 {
            BatteryBand::Green
        } else if level >= 31.0 {
            BatteryBand::Yellow
        } else if level >= 16.0 {
            BatteryBand::Orange
        } else {
            BatteryBand::Red
        }
    }
}

/// Robot status panel state, fed by the `/robot` channel.
#[derive(Debug, Clone, Default)]
pub struct RobotTelemetry {
    pose: RobotPose,
}

impl RobotTelemetry {
    pub fn pose(&self) -> &RobotPose {
        &self.pose
    }

    /// Merges a partial snapshot. Returns false for an empty snapshot.
    pub fn apply_snapshot(&mut self, value: &Value) -> bool {
        let Some(update) = RobotPoseUpdate::from_value(value) else {
            debug!("ignoring empty robot telemetry snapshot");
            return false;
        };
        self.pose.merge(update);
        true
    }

    pub fn can_apply(&self, action: RobotControl) -> bool {
        match action {
            RobotControl::Pause => !matches!(
                self.pose.status,
                Some(RobotStatus::Paused) | Some(RobotStatus::Stopped)
            ),
            RobotControl::Resume => self.pose.status != Some(RobotStatus::Active),
            RobotControl::Stop => true,
        }
    }

    /// Applies a control action locally and returns the command to forward, or `None`
    /// when the action is not available in the current status.
    pub fn apply_control(&mut self, action: RobotControl, timestamp_ms: i64) -> Option<RobotControlCommand> {
        if !self.can_apply(action) {
            return None;
        }
        self.pose.status = Some(action.resulting_status());
        Some(RobotControlCommand {
            action,
            timestamp: timestamp_ms,
        })
    }

    pub fn battery_band(&self) -> Option<BatteryBand> {
        self.pose.battery.map(BatteryBand::from_level)
    }

    pub fn load_label(&self) -> &'static str {
        match self.pose.load {
            Some(load) if load > 0.0 => "loaded",
            _ => "empty",
        }
    }
}
