//! Split tasks into today / upcoming / completed buckets.

use chore_core::model::Task;
use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;

/// Disjoint buckets covering every input task exactly once, each in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskGroups<'a> {
    pub today: Vec<&'a Task>,
    pub upcoming: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
}

impl TaskGroups<'_> {
    pub fn len(&self) -> usize {
        self.today.len() + self.upcoming.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bucket `tasks` relative to `now`.
///
/// Completed tasks go to `completed`. Incomplete tasks whose due date falls
/// on `now`'s calendar day (in `now`'s zone) go to `today`, as do tasks
/// with no due date. Everything else, overdue days included, is `upcoming`.
pub fn group_tasks<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> TaskGroups<'a> {
    let zone = now.timezone();
    let today = now.date_naive();

    let mut groups = TaskGroups::default();
    for task in tasks {
        if task.completed {
            groups.completed.push(task);
        } else if task.due_date.is_none() || is_due_on(task, today, &zone) {
            groups.today.push(task);
        } else {
            groups.upcoming.push(task);
        }
    }
    groups
}

/// Whether the task's due date lands on `day` as seen from `zone`.
pub(crate) fn is_due_on<Tz: TimeZone>(task: &Task, day: NaiveDate, zone: &Tz) -> bool {
    task.due_date
        .map(|due| due.with_timezone(zone).date_naive() == day)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, ids, task};
    use chore_core::model::Task;
    use chrono::FixedOffset;
    use std::collections::HashMap;

    #[test]
    fn test_grouping_scenario() {
        let now = at(2024, 3, 10, 12, 0);
        let tasks = vec![
            Task {
                due_date: Some(at(2024, 3, 10, 9, 0)),
                ..task(1)
            },
            Task {
                due_date: Some(at(2024, 3, 11, 9, 0)),
                ..task(2)
            },
            Task {
                due_date: Some(at(2024, 3, 9, 9, 0)),
                completed: true,
                completed_at: Some(at(2024, 3, 9, 18, 0)),
                ..task(3)
            },
        ];

        let groups = group_tasks(&tasks, &now);
        assert_eq!(ids(&groups.today), vec![1]);
        assert_eq!(ids(&groups.upcoming), vec![2]);
        assert_eq!(ids(&groups.completed), vec![3]);
    }

    #[test]
    fn test_undated_task_is_today() {
        let now = at(2024, 3, 10, 12, 0);
        let tasks = vec![task(1)];
        let groups = group_tasks(&tasks, &now);
        assert_eq!(ids(&groups.today), vec![1]);
    }

    #[test]
    fn test_calendar_day_not_elapsed_time() {
        let now = at(2024, 3, 10, 0, 30);
        let tasks = vec![
            Task {
                due_date: Some(at(2024, 3, 10, 23, 59)),
                ..task(1)
            },
            Task {
                due_date: Some(at(2024, 3, 10, 0, 1)),
                ..task(2)
            },
            // Under an hour earlier, but on the previous day.
            Task {
                due_date: Some(at(2024, 3, 9, 23, 59)),
                ..task(3)
            },
        ];
        let groups = group_tasks(&tasks, &now);
        assert_eq!(ids(&groups.today), vec![1, 2]);
        assert_eq!(ids(&groups.upcoming), vec![3]);
    }

    #[test]
    fn test_overdue_task_is_upcoming() {
        let now = at(2024, 3, 10, 12, 0);
        let tasks = vec![Task {
            due_date: Some(at(2024, 3, 1, 12, 0)),
            ..task(1)
        }];
        let groups = group_tasks(&tasks, &now);
        assert!(groups.today.is_empty());
        assert_eq!(ids(&groups.upcoming), vec![1]);
    }

    #[test]
    fn test_day_boundary_uses_callers_zone() {
        // 22:30 UTC on the 10th is already the 11th at UTC+2.
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = at(2024, 3, 11, 8, 0).with_timezone(&plus_two);
        let tasks = vec![Task {
            due_date: Some(at(2024, 3, 10, 22, 30)),
            ..task(1)
        }];

        let groups = group_tasks(&tasks, &now);
        assert_eq!(ids(&groups.today), vec![1]);

        let groups = group_tasks(&tasks, &at(2024, 3, 11, 8, 0));
        assert_eq!(ids(&groups.upcoming), vec![1]);
    }

    #[test]
    fn test_completed_wins_regardless_of_due_date() {
        let now = at(2024, 3, 10, 12, 0);
        let tasks = vec![
            Task {
                completed: true,
                ..task(1)
            },
            Task {
                completed: true,
                due_date: Some(at(2024, 3, 10, 9, 0)),
                ..task(2)
            },
        ];
        let groups = group_tasks(&tasks, &now);
        assert_eq!(ids(&groups.completed), vec![1, 2]);
        assert!(groups.today.is_empty());
    }

    #[test]
    fn test_partition_law() {
        let now = at(2024, 3, 10, 12, 0);
        let tasks: Vec<Task> = (0..40)
            .map(|i| Task {
                due_date: match i % 4 {
                    0 => None,
                    1 => Some(at(2024, 3, 10, (i % 24) as u32, 0)),
                    2 => Some(at(2024, 3, 1 + (i % 28) as u32, 6, 0)),
                    _ => Some(at(2023, 12, 31, 23, 0)),
                },
                completed: i % 3 == 0,
                ..task(i)
            })
            .collect();

        let groups = group_tasks(&tasks, &now);
        assert_eq!(groups.len(), tasks.len());

        let mut seen: HashMap<i64, usize> = HashMap::new();
        for t in groups
            .today
            .iter()
            .chain(&groups.upcoming)
            .chain(&groups.completed)
        {
            *seen.entry(t.id).or_default() += 1;
        }
        assert_eq!(seen.len(), tasks.len());
        assert!(seen.values().all(|&n| n == 1));

        // Stable: each bucket preserves input order.
        for bucket in [&groups.today, &groups.upcoming, &groups.completed] {
            let order = ids(bucket);
            let mut sorted = order.clone();
            sorted.sort();
            assert_eq!(order, sorted);
        }
    }

    #[test]
    fn test_empty_input() {
        let groups = group_tasks(&[], &at(2024, 3, 10, 12, 0));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let now = at(2024, 3, 10, 12, 0);
        let tasks = vec![
            task(1),
            Task {
                due_date: Some(at(2024, 3, 12, 9, 0)),
                ..task(2)
            },
        ];
        assert_eq!(group_tasks(&tasks, &now), group_tasks(&tasks, &now));
    }
}
