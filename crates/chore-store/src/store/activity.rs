//! Activity feed and per-user notifications.

use super::rows::{convert_all, ts, ActivityRow, NotificationRow};
use super::Store;
use chore_core::{
    error::ChoreError,
    model::{Activity, ActivityKind, HouseholdId, Notification, TaskId, UserId},
};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

/// An entry to write to the activity feed.
pub(crate) struct ActivityEntry {
    pub user_id: UserId,
    pub household_id: HouseholdId,
    pub kind: ActivityKind,
    pub task_id: Option<TaskId>,
    pub metadata: Option<serde_json::Value>,
}

/// Write an activity row on an open connection (usually inside the
/// transaction of the mutation it describes).
pub(crate) async fn record_activity(
    conn: &mut SqliteConnection,
    entry: &ActivityEntry,
    at: &DateTime<Utc>,
) -> Result<(), ChoreError> {
    let metadata = entry
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        "INSERT INTO activities (user_id, household_id, kind, task_id, metadata, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.user_id)
    .bind(entry.household_id)
    .bind(entry.kind.as_str())
    .bind(entry.task_id)
    .bind(metadata)
    .bind(ts(at))
    .execute(conn)
    .await
    .map_err(|e| ChoreError::Store(format!("activity write failed: {e}")))?;

    debug!(
        "activity: household {} user {} [{}] task {:?}",
        entry.household_id,
        entry.user_id,
        entry.kind.as_str(),
        entry.task_id
    );

    Ok(())
}

pub(crate) async fn notify(
    conn: &mut SqliteConnection,
    user_id: UserId,
    message: &str,
    task_id: Option<TaskId>,
    at: &DateTime<Utc>,
) -> Result<(), ChoreError> {
    sqlx::query(
        "INSERT INTO notifications (user_id, message, task_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(message)
    .bind(task_id)
    .bind(ts(at))
    .execute(conn)
    .await
    .map_err(|e| ChoreError::Store(format!("notification write failed: {e}")))?;
    Ok(())
}

impl Store {
    /// Household activity feed, newest first.
    pub async fn activities(
        &self,
        household_id: HouseholdId,
        limit: i64,
    ) -> Result<Vec<Activity>, ChoreError> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            "SELECT id, user_id, household_id, kind, task_id, metadata, created_at \
             FROM activities WHERE household_id = ? \
             ORDER BY id DESC LIMIT ?",
        )
        .bind(household_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("list activities failed: {e}")))?;

        convert_all(rows)
    }

    /// A user's notifications, newest first.
    pub async fn notifications(&self, user_id: UserId) -> Result<Vec<Notification>, ChoreError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT id, user_id, message, read, task_id, created_at \
             FROM notifications WHERE user_id = ? ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("list notifications failed: {e}")))?;

        convert_all(rows)
    }

    /// Mark every unread notification for a user as read. Returns how many changed.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, ChoreError> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ChoreError::Store(format!("mark read failed: {e}")))?;

        Ok(result.rows_affected())
    }
}
