//! Delivery queue shown on the Tasks tab.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use shared::{
    domain::{Priority, QueueTask, QueueTaskUpdate},
    protocol::DeliveryTaskRecord,
};
use thiserror::Error;
use tracing::debug;

use crate::ordering::{sort_tasks, SortMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
}

impl Urgency {
    pub fn priority(self) -> Priority {
        match self {
            Urgency::Normal => Priority::Medium,
            Urgency::Urgent => Priority::High,
        }
    }
}

/// The "Add Task" form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryRequest {
    pub nurse_name: String,
    pub supplies: Vec<String>,
    pub source_location: String,
    pub destination_rooms: Vec<String>,
    pub urgency: Urgency,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryRequestError {
    #[error("nurse name is required")]
    MissingNurseName,
    #[error("source location is required")]
    MissingSource,
    #[error("at least one destination room is required")]
    MissingDestination,
}

impl DeliveryRequest {
    pub fn validate(&self) -> Result<(), DeliveryRequestError> {
        if self.nurse_name.trim().is_empty() {
            return Err(DeliveryRequestError::MissingNurseName);
        }
        if self.source_location.trim().is_empty() {
            return Err(DeliveryRequestError::MissingSource);
        }
        if !self.destination_rooms.iter().any(|room| !room.trim().is_empty()) {
            return Err(DeliveryRequestError::MissingDestination);
        }
        Ok(())
    }
}

fn non_empty(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct TaskQueue {
    tasks: Vec<QueueTask>,
    sort_mode: SortMode,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::seeded()
    }
}

impl TaskQueue {
    pub fn new(tasks: Vec<QueueTask>) -> Self {
        Self {
            tasks,
            sort_mode: SortMode::default(),
        }
    }

    /// The queue a fresh dashboard opens with.
    pub fn seeded() -> Self {
        Self::new(vec![
            QueueTask {
                id: 1,
                name: "Deliver meds".to_string(),
                priority: Priority::High,
                time_added: "2025-10-09 19:30".to_string(),
            },
            QueueTask {
                id: 2,
                name: "Collect vitals".to_string(),
                priority: Priority::Medium,
                time_added: "2025-10-09 19:45".to_string(),
            },
        ])
    }

    pub fn tasks(&self) -> &[QueueTask] {
        &self.tasks
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
    }

    /// Tasks in display order for the current sort mode.
    pub fn sorted(&self) -> Vec<QueueTask> {
        sort_tasks(&self.tasks, self.sort_mode)
    }

    fn next_id(&self) -> i64 {
        self.tasks.iter().map(|task| task.id).max().map_or(1, |max| max + 1)
    }

    /// Validates the form and appends the resulting task. The returned record is what
    /// gets forwarded to the delivery-task sink.
    pub fn submit(
        &mut self,
        request: &DeliveryRequest,
        now: DateTime<Utc>,
    ) -> Result<(QueueTask, DeliveryTaskRecord), DeliveryRequestError> {
        request.validate()?;

        let supplies = non_empty(&request.supplies);
        let rooms = non_empty(&request.destination_rooms);
        let task = QueueTask {
            id: self.next_id(),
            name: format!("Deliver {} to {}", supplies.join(", "), rooms.join(", ")),
            priority: request.urgency.priority(),
            time_added: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let record = DeliveryTaskRecord {
            name: task.name.clone(),
            priority: task.priority,
            time_added: task.time_added.clone(),
            nurse_name: request.nurse_name.trim().to_string(),
            source_location: request.source_location.trim().to_string(),
            destination_rooms: rooms,
            supplies,
            notes: request.notes.trim().to_string(),
        };

        debug!(id = task.id, priority = task.priority.label(), "delivery task queued");
        self.tasks.push(task.clone());
        Ok((task, record))
    }

    /// Merges a partial update into the task with `id`. Returns false when there is no
    /// such task or the update is empty.
    pub fn apply_update(&mut self, id: i64, value: &Value) -> bool {
        let Some(update) = QueueTaskUpdate::from_value(value) else {
            return false;
        };
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return false;
        };
        task.merge(update);
        true
    }
}
