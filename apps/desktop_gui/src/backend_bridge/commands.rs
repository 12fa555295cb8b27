//! Backend commands queued from UI to backend worker.

use client_core::MapFetchRequest;
use shared::{
    domain::CommandId,
    protocol::{DeliveryTaskRecord, RobotControlCommand},
};

pub enum BackendCommand {
    Connect {
        server_url: String,
    },
    FetchMap(MapFetchRequest),
    SendRobotControl(RobotControlCommand),
    SubmitDeliveryTask(DeliveryTaskRecord),
    RecordVoiceCommand {
        command: String,
        timestamp_ms: i64,
    },
    MarkVoiceCommandSent(CommandId),
    Shutdown,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Connect { .. } => "connect",
            BackendCommand::FetchMap(_) => "fetch_map",
            BackendCommand::SendRobotControl(_) => "send_robot_control",
            BackendCommand::SubmitDeliveryTask(_) => "submit_delivery_task",
            BackendCommand::RecordVoiceCommand { .. } => "record_voice_command",
            BackendCommand::MarkVoiceCommandSent(_) => "mark_voice_command_sent",
            BackendCommand::Shutdown => "shutdown",
        }
    }
}
