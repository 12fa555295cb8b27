use serde::{Deserialize, Serialize};
use shared::domain::QueueTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Priority first, then oldest `time_added` within a priority.
    #[default]
    Time,
    Priority,
}

impl SortMode {
    pub fn label(self) -> &'static str {
        match self {
            SortMode::Time => "Time Added",
            SortMode::Priority => "Priority",
        }
    }
}

/// Returns the tasks in display order; the input is left untouched. Both modes are
/// stable, and `Time` still groups by priority before comparing timestamps.
pub fn sort_tasks(tasks: &[QueueTask], mode: SortMode) -> Vec<QueueTask> {
    let mut sorted = tasks.to_vec();
    match mode {
        SortMode::Time => sorted.sort_by(|a, b| {
            a.priority
                .rank()
                .cmp(&b.priority.rank())
                .then_with(|| a.time_added.cmp(&b.time_added))
        }),
        SortMode::Priority => sorted.sort_by_key(|task| task.priority.rank()),
    }
    sorted
}
