//! Household, user, task, and activity records.
//!
//! These are the well-typed shapes every other crate works with. Rows are
//! converted into them at the store boundary, so optional fields here are the
//! only "missing data" consumers ever need to handle.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type UserId = i64;
pub type HouseholdId = i64;
pub type TaskId = i64;

/// A person who can be assigned chores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    /// "First Last", trimmed when either part is empty.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Up to two uppercase initials, e.g. "AB".
    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .take(1)
            .chain(self.last_name.chars().take(1))
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// Input for registering a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A group of users sharing a set of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub id: HouseholdId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a household. The creator, if given, joins as admin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHousehold {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by_id: Option<UserId>,
}

/// Input for adding a user to a household.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub user_id: UserId,
    #[serde(default)]
    pub is_admin: bool,
}

/// A user's membership in a household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user: User,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

/// How often a task comes back after completion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    Never,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub const ALL: [Recurrence; 4] = [Self::Never, Self::Daily, Self::Weekly, Self::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parse the stored form. Unknown values fall back to `Never`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            _ => Self::Never,
        }
    }

    /// Due date of the next occurrence, or `None` for one-off tasks.
    pub fn next_due(&self, due: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Never => None,
            Self::Daily => Some(due + chrono::Duration::days(1)),
            Self::Weekly => Some(due + chrono::Duration::days(7)),
            Self::Monthly => due.checked_add_months(Months::new(1)),
        }
    }
}

/// A chore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub household_id: HouseholdId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assigned_to_id: Option<UserId>,
    pub created_by_id: UserId,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by_id: Option<UserId>,
    #[serde(default)]
    pub recurring: Recurrence,
    pub send_reminder: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub household_id: HouseholdId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to_id: Option<UserId>,
    pub created_by_id: UserId,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurring: Recurrence,
    #[serde(default = "default_send_reminder")]
    pub send_reminder: bool,
}

fn default_send_reminder() -> bool {
    true
}

/// Partial update of a task. Absent fields are left unchanged; for the
/// nullable fields an explicit `null` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub assigned_to_id: Option<Option<UserId>>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub recurring: Option<Recurrence>,
    #[serde(default)]
    pub send_reminder: Option<bool>,
    /// Who made the change; the task's creator when absent.
    #[serde(default)]
    pub updated_by_id: Option<UserId>,
}

/// Distinguish a field set to `null` from a missing one.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// What happened in an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TaskCreated,
    TaskCompleted,
    TaskAssigned,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::TaskCompleted => "task_completed",
            Self::TaskAssigned => "task_assigned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "task_created" => Some(Self::TaskCreated),
            "task_completed" => Some(Self::TaskCompleted),
            "task_assigned" => Some(Self::TaskAssigned),
            _ => None,
        }
    }
}

/// One entry in a household's activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub user_id: UserId,
    pub household_id: HouseholdId,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A polled, per-user notice (e.g. "you were assigned X").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    pub message: String,
    pub read: bool,
    pub task_id: Option<TaskId>,
    pub created_at: DateTime<Utc>,
}

/// Full current state of one household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub household: Household,
    pub users: Vec<User>,
    pub tasks: Vec<Task>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn is_member(&self, id: UserId) -> bool {
        self.user(id).is_some()
    }
}
