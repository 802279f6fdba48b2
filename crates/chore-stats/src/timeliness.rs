//! How early or late completed tasks were finished relative to their due date.

use crate::rounding::round_half_up;
use chore_core::model::{Task, TaskId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMELINESS_LIMIT: usize = 5;

const MS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeliness {
    /// Completed on or before the due day (`days_from_due <= 0`).
    Early,
    Late,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinessEntry {
    pub task_id: TaskId,
    pub task_title: String,
    /// Positive = days late, negative = days early.
    pub days_from_due: i64,
    pub status: Timeliness,
}

/// Completed tasks with both a due date and a completion time, most-early
/// first, truncated to `limit`. Tasks missing either timestamp are skipped.
pub fn completion_timeliness(tasks: &[Task], limit: usize) -> Vec<TimelinessEntry> {
    let mut entries: Vec<TimelinessEntry> = tasks
        .iter()
        .filter(|t| t.completed)
        .filter_map(|t| {
            let (due, done) = (t.due_date?, t.completed_at?);
            let days = (done - due).num_milliseconds() as f64 / MS_PER_DAY;
            let days_from_due = round_half_up(days);
            Some(TimelinessEntry {
                task_id: t.id,
                task_title: t.title.clone(),
                days_from_due,
                status: if days_from_due > 0 {
                    Timeliness::Late
                } else {
                    Timeliness::Early
                },
            })
        })
        .collect();

    entries.sort_by_key(|e| e.days_from_due);
    entries.truncate(limit);
    entries
}
