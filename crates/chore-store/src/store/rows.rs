//! Raw row shapes and their conversion into the typed model.
//!
//! Timestamps are stored as RFC 3339 text. A row that fails to parse is a
//! store error, so nothing downstream ever sees a half-valid record.

use chore_core::{
    error::ChoreError,
    model::{
        Activity, ActivityKind, Household, Member, Notification, Recurrence, Task, User,
    },
};
use chore_stats::HouseholdSummary;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;

/// Format a timestamp the way every column stores it.
pub(crate) fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_ts(value: &str, column: &str) -> Result<DateTime<Utc>, ChoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ChoreError::Store(format!("invalid {column} timestamp '{value}': {e}")))
}

fn parse_opt_ts(value: Option<String>, column: &str) -> Result<Option<DateTime<Utc>>, ChoreError> {
    value.as_deref().map(|v| parse_ts(v, column)).transpose()
}

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            avatar: row.avatar,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct MemberRow {
    #[sqlx(flatten)]
    pub user: UserRow,
    pub is_admin: bool,
    pub joined_at: String,
}

impl TryFrom<MemberRow> for Member {
    type Error = ChoreError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Self {
            joined_at: parse_ts(&row.joined_at, "joined_at")?,
            is_admin: row.is_admin,
            user: row.user.into(),
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct HouseholdRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl TryFrom<HouseholdRow> for Household {
    type Error = ChoreError;

    fn try_from(row: HouseholdRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: parse_ts(&row.created_at, "created_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TaskRow {
    pub id: i64,
    pub household_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_id: Option<i64>,
    pub created_by_id: i64,
    pub due_date: Option<String>,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub completed_by_id: Option<i64>,
    pub recurring: String,
    pub send_reminder: bool,
    pub created_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = ChoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            household_id: row.household_id,
            title: row.title,
            description: row.description,
            assigned_to_id: row.assigned_to_id,
            created_by_id: row.created_by_id,
            due_date: parse_opt_ts(row.due_date, "due_date")?,
            completed: row.completed,
            completed_at: parse_opt_ts(row.completed_at, "completed_at")?,
            completed_by_id: row.completed_by_id,
            recurring: Recurrence::from_str_lossy(&row.recurring),
            send_reminder: row.send_reminder,
            created_at: parse_ts(&row.created_at, "created_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ActivityRow {
    pub id: i64,
    pub user_id: i64,
    pub household_id: i64,
    pub kind: String,
    pub task_id: Option<i64>,
    pub metadata: Option<String>,
    pub created_at: String,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = ChoreError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let kind = ActivityKind::parse(&row.kind)
            .ok_or_else(|| ChoreError::Store(format!("unknown activity kind '{}'", row.kind)))?;
        let metadata = row
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            household_id: row.household_id,
            kind,
            task_id: row.task_id,
            metadata,
            created_at: parse_ts(&row.created_at, "created_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub read: bool,
    pub task_id: Option<i64>,
    pub created_at: String,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = ChoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            message: row.message,
            read: row.read,
            task_id: row.task_id,
            created_at: parse_ts(&row.created_at, "created_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SummaryRow {
    pub total: i64,
    pub completed_count: i64,
    pub pending_count: i64,
    pub weekly_progress: i64,
    pub unassigned_count: i64,
}

impl From<SummaryRow> for HouseholdSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            total: row.total.max(0) as usize,
            completed_count: row.completed_count.max(0) as usize,
            pending_count: row.pending_count.max(0) as usize,
            weekly_progress: row.weekly_progress.clamp(0, 100) as u8,
            unassigned_count: row.unassigned_count.max(0) as usize,
        }
    }
}

/// Convert a batch of rows, failing on the first bad one.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, ChoreError>
where
    T: TryFrom<R, Error = ChoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
