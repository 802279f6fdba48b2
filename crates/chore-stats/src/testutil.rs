use chore_core::model::{Task, TaskId, User, UserId};
use chrono::{DateTime, TimeZone, Utc};

pub(crate) fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub(crate) fn task(id: TaskId) -> Task {
    Task {
        id,
        household_id: 1,
        title: format!("Task {id}"),
        description: None,
        assigned_to_id: None,
        created_by_id: 1,
        due_date: None,
        completed: false,
        completed_at: None,
        completed_by_id: None,
        recurring: Default::default(),
        send_reminder: true,
        created_at: at(2024, 1, 1, 0, 0),
    }
}

pub(crate) fn user(id: UserId, first_name: &str) -> User {
    User {
        id,
        username: first_name.to_lowercase(),
        first_name: first_name.to_string(),
        last_name: "Test".to_string(),
        email: format!("{}@example.com", first_name.to_lowercase()),
        avatar: None,
    }
}

pub(crate) fn ids(tasks: &[&Task]) -> Vec<TaskId> {
    tasks.iter().map(|t| t.id).collect()
}
