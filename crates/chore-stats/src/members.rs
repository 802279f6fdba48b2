//! Per-member completion statistics.

use crate::rounding::percent;
use chore_core::model::{Task, User, UserId};
use serde::Serialize;

/// Completion numbers for one household member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats<'a> {
    pub user_id: UserId,
    pub name: String,
    pub initials: String,
    pub assigned: usize,
    pub completed: usize,
    pub pending: usize,
    /// `0..=100`; 0 when nothing is assigned.
    pub completion_rate: u8,
    /// Earliest-due pending task; undated tasks sort last.
    pub next_due: Option<&'a Task>,
}

/// One entry per roster user, in roster order, including users with no tasks.
///
/// Tasks assigned to ids outside the roster are not attributed to anyone.
pub fn member_stats<'a>(tasks: &'a [Task], users: &[User]) -> Vec<MemberStats<'a>> {
    users
        .iter()
        .map(|user| {
            let mut assigned = 0;
            let mut completed = 0;
            let mut next_due: Option<&Task> = None;

            for task in tasks.iter().filter(|t| t.assigned_to_id == Some(user.id)) {
                assigned += 1;
                if task.completed {
                    completed += 1;
                } else if next_due.map_or(true, |best| due_key(task) < due_key(best)) {
                    next_due = Some(task);
                }
            }

            MemberStats {
                user_id: user.id,
                name: user.display_name(),
                initials: user.initials(),
                assigned,
                completed,
                pending: assigned - completed,
                completion_rate: percent(completed, assigned),
                next_due,
            }
        })
        .collect()
}

/// Dated before undated, then by due date.
fn due_key(task: &Task) -> (bool, Option<chrono::DateTime<chrono::Utc>>) {
    (task.due_date.is_none(), task.due_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, task, user};

    #[test]
    fn test_member_stats_scenario() {
        let users = vec![user(1, "Alice"), user(2, "Bob")];
        let tasks = vec![
            Task {
                assigned_to_id: Some(1),
                completed: true,
                ..task(1)
            },
            Task {
                assigned_to_id: Some(1),
                ..task(2)
            },
            Task {
                assigned_to_id: Some(2),
                ..task(3)
            },
        ];

        let stats = member_stats(&tasks, &users);
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].user_id, 1);
        assert_eq!(stats[0].assigned, 2);
        assert_eq!(stats[0].completed, 1);
        assert_eq!(stats[0].pending, 1);
        assert_eq!(stats[0].completion_rate, 50);

        assert_eq!(stats[1].user_id, 2);
        assert_eq!(stats[1].assigned, 1);
        assert_eq!(stats[1].completed, 0);
        assert_eq!(stats[1].completion_rate, 0);
    }

    #[test]
    fn test_user_without_tasks_has_zero_rate() {
        let users = vec![user(7, "Idle")];
        let tasks = [task(1)];
        let stats = member_stats(&tasks, &users);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].assigned, 0);
        assert_eq!(stats[0].completion_rate, 0);
        assert!(stats[0].next_due.is_none());
    }

    #[test]
    fn test_unknown_assignee_is_ignored() {
        let users = vec![user(1, "Alice")];
        let tasks = vec![Task {
            assigned_to_id: Some(99),
            ..task(1)
        }];
        let stats = member_stats(&tasks, &users);
        assert_eq!(stats[0].assigned, 0);
    }

    #[test]
    fn test_next_due_prefers_earliest_dated() {
        let users = vec![user(1, "Alice")];
        let tasks = vec![
            Task {
                assigned_to_id: Some(1),
                ..task(1)
            },
            Task {
                assigned_to_id: Some(1),
                due_date: Some(at(2024, 5, 3, 9, 0)),
                ..task(2)
            },
            Task {
                assigned_to_id: Some(1),
                due_date: Some(at(2024, 5, 1, 9, 0)),
                ..task(3)
            },
            Task {
                assigned_to_id: Some(1),
                due_date: Some(at(2024, 4, 1, 9, 0)),
                completed: true,
                ..task(4)
            },
        ];
        let stats = member_stats(&tasks, &users);
        assert_eq!(stats[0].next_due.map(|t| t.id), Some(3));
    }

    #[test]
    fn test_next_due_ties_keep_input_order() {
        let users = vec![user(1, "Alice")];
        let tasks = vec![
            Task {
                assigned_to_id: Some(1),
                ..task(5)
            },
            Task {
                assigned_to_id: Some(1),
                ..task(6)
            },
        ];
        let stats = member_stats(&tasks, &users);
        assert_eq!(stats[0].next_due.map(|t| t.id), Some(5));
    }

    #[test]
    fn test_rates_within_bounds() {
        let users: Vec<_> = (1..=4).map(|i| user(i, "U")).collect();
        let tasks: Vec<Task> = (0..30)
            .map(|i| Task {
                assigned_to_id: Some(i % 5),
                completed: i % 2 == 0,
                ..task(i)
            })
            .collect();
        for s in member_stats(&tasks, &users) {
            assert!(s.completion_rate <= 100);
            assert_eq!(s.assigned, s.completed + s.pending);
        }
    }

    #[test]
    fn test_idempotent() {
        let users = vec![user(1, "Alice"), user(2, "Bob")];
        let tasks = vec![
            Task {
                assigned_to_id: Some(1),
                due_date: Some(at(2024, 3, 12, 9, 0)),
                ..task(1)
            },
            Task {
                assigned_to_id: Some(2),
                completed: true,
                ..task(2)
            },
            task(3),
        ];
        assert_eq!(member_stats(&tasks, &users), member_stats(&tasks, &users));
    }
}
