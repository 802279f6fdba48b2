//! Everything the dashboard page shows, computed from one snapshot.

use crate::grouping::{group_tasks, TaskGroups};
use crate::members::{member_stats, MemberStats};
use crate::summary::{household_summary_for, summary_trend, HouseholdSummary, SummaryTrend};
use chore_core::model::Snapshot;
use chrono::{DateTime, TimeZone};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard<'a> {
    pub household_id: i64,
    pub household_name: &'a str,
    pub groups: TaskGroups<'a>,
    pub summary: HouseholdSummary,
    pub trend: SummaryTrend,
    pub members: Vec<MemberStats<'a>>,
    pub due_today_count: usize,
}

/// Build the dashboard for `snapshot` as of `now`. `previous` is the summary
/// recorded for the prior week, if any.
pub fn dashboard<'a, Tz: TimeZone>(
    snapshot: &'a Snapshot,
    now: &DateTime<Tz>,
    previous: Option<&HouseholdSummary>,
) -> Dashboard<'a> {
    let groups = group_tasks(&snapshot.tasks, now);
    let summary = household_summary_for(&snapshot.tasks, &snapshot.users);
    Dashboard {
        household_id: snapshot.household.id,
        household_name: &snapshot.household.name,
        due_today_count: groups.today.len(),
        groups,
        trend: summary_trend(&summary, previous),
        summary,
        members: member_stats(&snapshot.tasks, &snapshot.users),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, task, user};
    use chore_core::model::{Household, Task};

    fn snapshot() -> Snapshot {
        Snapshot {
            household: Household {
                id: 1,
                name: "Flat 4B".into(),
                description: None,
                created_at: at(2024, 1, 1, 0, 0),
            },
            users: vec![user(1, "Alice"), user(2, "Bob")],
            tasks: vec![
                Task {
                    assigned_to_id: Some(1),
                    due_date: Some(at(2024, 3, 10, 18, 0)),
                    ..task(1)
                },
                Task {
                    assigned_to_id: Some(2),
                    completed: true,
                    ..task(2)
                },
                Task {
                    due_date: Some(at(2024, 3, 14, 18, 0)),
                    ..task(3)
                },
            ],
            fetched_at: at(2024, 3, 10, 12, 0),
        }
    }

    #[test]
    fn test_dashboard_bundle() {
        let snap = snapshot();
        let previous = HouseholdSummary {
            total: 2,
            completed_count: 0,
            pending_count: 2,
            weekly_progress: 0,
            unassigned_count: 1,
        };
        let dash = dashboard(&snap, &at(2024, 3, 10, 12, 0), Some(&previous));

        assert_eq!(dash.household_name, "Flat 4B");
        assert_eq!(dash.due_today_count, 1);
        assert_eq!(dash.groups.upcoming.len(), 1);
        assert_eq!(dash.summary.total, 3);
        assert_eq!(dash.summary.weekly_progress, 33);
        assert_eq!(dash.summary.unassigned_count, 1);
        assert_eq!(dash.trend.completed_diff, 1);
        assert_eq!(dash.trend.pending_diff, 0);
        assert_eq!(dash.members.len(), 2);
        assert_eq!(dash.members[1].completion_rate, 100);
    }

    #[test]
    fn test_dashboard_serializes_camel_case() {
        let snap = snapshot();
        let dash = dashboard(&snap, &at(2024, 3, 10, 12, 0), None);
        let json = serde_json::to_value(&dash).unwrap();
        assert_eq!(json["dueTodayCount"], 1);
        assert_eq!(json["summary"]["weeklyProgress"], 33);
        assert_eq!(json["trend"]["pendingDiff"], 0);
        assert_eq!(json["groups"]["today"][0]["id"], 1);
        assert_eq!(json["members"][0]["nextDue"]["id"], 1);
    }
}
