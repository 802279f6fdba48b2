//! Smaller projections used by the schedule, chart, and "my chores" pages.

use crate::grouping::is_due_on;
use chore_core::model::{Recurrence, Task, UserId};
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceCount {
    pub recurrence: Recurrence,
    pub count: usize,
}

/// Task count per recurrence kind, in never/daily/weekly/monthly order,
/// skipping kinds with no tasks.
pub fn recurrence_breakdown(tasks: &[Task]) -> Vec<RecurrenceCount> {
    Recurrence::ALL
        .iter()
        .map(|&recurrence| RecurrenceCount {
            recurrence,
            count: tasks.iter().filter(|t| t.recurring == recurrence).count(),
        })
        .filter(|c| c.count > 0)
        .collect()
}

/// Tasks due on `day` in `zone`, in input order. Undated tasks never match.
pub fn tasks_on_day<'a, Tz: TimeZone>(tasks: &'a [Task], day: NaiveDate, zone: &Tz) -> Vec<&'a Task> {
    tasks.iter().filter(|t| is_due_on(t, day, zone)).collect()
}

/// One member's tabs: their pending work, their finished work, and everyone else's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberView<'a> {
    pub pending: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
    pub others: Vec<&'a Task>,
}

pub fn member_view(tasks: &[Task], user_id: UserId) -> MemberView<'_> {
    let mut view = MemberView::default();
    for task in tasks {
        match (task.assigned_to_id == Some(user_id), task.completed) {
            (true, false) => view.pending.push(task),
            (true, true) => view.completed.push(task),
            (false, _) => view.others.push(task),
        }
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, ids, task};
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_recurrence_breakdown() {
        let tasks = vec![
            task(1),
            Task {
                recurring: Recurrence::Weekly,
                ..task(2)
            },
            Task {
                recurring: Recurrence::Weekly,
                ..task(3)
            },
            task(4),
            Task {
                recurring: Recurrence::Daily,
                ..task(5)
            },
        ];
        let breakdown = recurrence_breakdown(&tasks);
        assert_eq!(
            breakdown,
            vec![
                RecurrenceCount {
                    recurrence: Recurrence::Never,
                    count: 2
                },
                RecurrenceCount {
                    recurrence: Recurrence::Daily,
                    count: 1
                },
                RecurrenceCount {
                    recurrence: Recurrence::Weekly,
                    count: 2
                },
            ]
        );
        assert!(recurrence_breakdown(&[]).is_empty());
    }

    #[test]
    fn test_tasks_on_day() {
        let tasks = vec![
            Task {
                due_date: Some(at(2024, 6, 1, 8, 0)),
                ..task(1)
            },
            task(2),
            Task {
                due_date: Some(at(2024, 6, 2, 8, 0)),
                ..task(3)
            },
            Task {
                due_date: Some(at(2024, 6, 1, 23, 0)),
                completed: true,
                ..task(4)
            },
        ];
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(ids(&tasks_on_day(&tasks, day, &Utc)), vec![1, 4]);

        // At UTC+3 the 23:00 task moves to the 2nd.
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(ids(&tasks_on_day(&tasks, day, &plus_three)), vec![1]);
    }

    #[test]
    fn test_member_view() {
        let tasks = vec![
            Task {
                assigned_to_id: Some(1),
                ..task(1)
            },
            Task {
                assigned_to_id: Some(1),
                completed: true,
                ..task(2)
            },
            Task {
                assigned_to_id: Some(2),
                ..task(3)
            },
            task(4),
        ];
        let view = member_view(&tasks, 1);
        assert_eq!(ids(&view.pending), vec![1]);
        assert_eq!(ids(&view.completed), vec![2]);
        assert_eq!(ids(&view.others), vec![3, 4]);
    }
}
