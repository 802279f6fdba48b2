//! Household-wide counts and week-over-week trend.

use crate::rounding::percent;
use chore_core::model::{Task, User};
use serde::{Deserialize, Serialize};

/// Current-period aggregates for a household.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdSummary {
    pub total: usize,
    pub completed_count: usize,
    pub pending_count: usize,
    /// `round(100 * completed / total)`, 0 for an empty household.
    pub weekly_progress: u8,
    pub unassigned_count: usize,
}

/// Change against the previous recorded period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTrend {
    pub pending_diff: i64,
    pub completed_diff: i64,
}

/// Summary without a roster: only tasks with no assignee count as unassigned.
pub fn household_summary(tasks: &[Task]) -> HouseholdSummary {
    summarize(tasks, |task| task.assigned_to_id.is_none())
}

/// Summary against a roster: assignees outside it also count as unassigned.
pub fn household_summary_for(tasks: &[Task], users: &[User]) -> HouseholdSummary {
    summarize(tasks, |task| match task.assigned_to_id {
        Some(id) => !users.iter().any(|u| u.id == id),
        None => true,
    })
}

fn summarize(tasks: &[Task], is_unassigned: impl Fn(&Task) -> bool) -> HouseholdSummary {
    let completed_count = tasks.iter().filter(|t| t.completed).count();
    let total = tasks.len();
    HouseholdSummary {
        total,
        completed_count,
        pending_count: total - completed_count,
        weekly_progress: percent(completed_count, total),
        unassigned_count: tasks.iter().filter(|t| is_unassigned(t)).count(),
    }
}

/// Diff `current` against `previous`; both diffs are 0 when there is no prior period.
pub fn summary_trend(current: &HouseholdSummary, previous: Option<&HouseholdSummary>) -> SummaryTrend {
    match previous {
        Some(prev) => SummaryTrend {
            pending_diff: current.pending_count as i64 - prev.pending_count as i64,
            completed_diff: current.completed_count as i64 - prev.completed_count as i64,
        },
        None => SummaryTrend::default(),
    }
}
