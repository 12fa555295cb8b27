//! Voice-command history: cached locally, refreshed from the push source.

use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{CommandId, VoiceCommand},
    protocol::{voice_commands_from_value, VoiceCommandEntry, VOICE_COMMANDS_PATH},
};
use storage::{cache_get_json, cache_put_json, LocalCache};
use tracing::{info, warn};

use crate::{error::ClientError, transport::CommandSink};

pub const VOICE_COMMANDS_CACHE_KEY: &str = "voiceCommands";

pub struct VoiceCommandLog {
    commands: Vec<VoiceCommand>,
    cache: Arc<dyn LocalCache>,
}

impl VoiceCommandLog {
    /// Starts from the cached list so history shows before the push source answers.
    /// An unreadable cache starts empty.
    pub async fn restore(cache: Arc<dyn LocalCache>) -> Self {
        let commands =
            match cache_get_json::<Vec<VoiceCommand>>(cache.as_ref(), VOICE_COMMANDS_CACHE_KEY).await {
                Ok(commands) => commands.unwrap_or_default(),
                Err(err) => {
                    warn!(error = %err, "failed to read cached voice commands");
                    Vec::new()
                }
            };
        Self { commands, cache }
    }

    /// Newest first.
    pub fn commands(&self) -> &[VoiceCommand] {
        &self.commands
    }

    /// Replaces the list with the pushed mapping; an empty push clears list and cache.
    pub async fn apply_snapshot(&mut self, value: &Value) -> Result<(), ClientError> {
        self.commands = voice_commands_from_value(value);
        if self.commands.is_empty() {
            self.cache
                .remove(VOICE_COMMANDS_CACHE_KEY)
                .await
                .map_err(ClientError::Cache)
        } else {
            self.persist().await
        }
    }

    /// Appends a new command through the sink and records it locally.
    pub async fn record(
        &mut self,
        sink: &dyn CommandSink,
        command: &str,
        timestamp_ms: i64,
    ) -> Result<VoiceCommand, ClientError> {
        let entry = VoiceCommandEntry {
            command: command.trim().to_string(),
            timestamp: timestamp_ms,
            sent_to_bot: false,
        };
        let id = sink
            .append(VOICE_COMMANDS_PATH, serde_json::to_value(&entry)?)
            .await?;
        let recorded = entry.into_command(CommandId::new(id));
        info!(id = %recorded.id, "voice command recorded");

        self.commands.retain(|existing| existing.id != recorded.id);
        self.commands.push(recorded.clone());
        self.commands.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.persist().await?;
        Ok(recorded)
    }

    /// Flags a command as handed to the robot. Returns false for unknown or already-sent ids.
    pub async fn mark_sent(&mut self, id: &CommandId) -> Result<bool, ClientError> {
        let Some(command) = self
            .commands
            .iter_mut()
            .find(|command| &command.id == id && !command.sent_to_bot)
        else {
            return Ok(false);
        };
        command.sent_to_bot = true;
        self.persist().await?;
        Ok(true)
    }

    async fn persist(&self) -> Result<(), ClientError> {
        cache_put_json(self.cache.as_ref(), VOICE_COMMANDS_CACHE_KEY, &self.commands)
            .await
            .map_err(ClientError::Cache)
    }
}

#[cfg(test)]
#[path = "tests/voice_tests.rs"]
mod tests;
