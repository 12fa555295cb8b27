//! UI/backend events and error modeling for desktop GUI controller.

use client_core::MapFetchResult;
use serde_json::Value;
use shared::domain::VoiceCommand;

pub enum UiEvent {
    Info(String),
    Connected {
        server_url: String,
    },
    Error(UiError),
    /// Snapshot of the robot/task channel.
    RobotSnapshot(Value),
    /// Snapshot of the robot telemetry channel.
    RobotTelemetry(Value),
    MapFetched(MapFetchResult),
    VoiceCommandsUpdated(Vec<VoiceCommand>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Validation,
    Storage,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Connect,
    SendCommand,
    VoiceLog,
}

impl UiErrorContext {
    pub fn label(self) -> &'static str {
        match self {
            UiErrorContext::BackendStartup => "Startup",
            UiErrorContext::Connect => "Connect",
            UiErrorContext::SendCommand => "Robot link",
            UiErrorContext::VoiceLog => "Voice log",
        }
    }
}

pub fn classify_connect_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("must start with http") {
        "Server URL must start with http:// or https://.".to_string()
    } else if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Relay unreachable; check URL/network and reconnect.".to_string()
    } else {
        format!("Connection error: {message}")
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("sqlite")
            || message_lower.contains("cache")
            || message_lower.contains("database")
        {
            UiErrorCategory::Storage
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("required")
            || message_lower.contains("must")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("connect")
            || message_lower.contains("network")
            || message_lower.contains("http")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
