//! Task CRUD, completion, and recurrence.
//!
//! Every mutation writes its activity (and notification, for assignments)
//! in the same transaction as the task change.

use super::activity::{notify, record_activity, ActivityEntry};
use super::rows::{convert_all, ts, TaskRow};
use super::Store;
use chore_core::{
    error::ChoreError,
    model::{ActivityKind, HouseholdId, NewTask, Task, TaskId, TaskPatch, UserId},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::info;

/// Result of completing a task: the completed task and, for recurring
/// tasks, the freshly created next occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub task: Task,
    pub next: Option<Task>,
}

impl Store {
    pub async fn get_task(&self, id: TaskId) -> Result<Option<Task>, ChoreError> {
        let mut conn = self.acquire().await?;
        fetch_task(&mut *conn, id).await
    }

    /// All tasks of a household, oldest first.
    pub async fn tasks_for_household(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<Task>, ChoreError> {
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT * FROM tasks WHERE household_id = ? ORDER BY id ASC")
                .bind(household_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ChoreError::Store(format!("list tasks failed: {e}")))?;

        convert_all(rows)
    }

    /// Create a task after checking the household and that creator and
    /// assignee are members of it.
    pub async fn create_task(&self, new: &NewTask) -> Result<Task, ChoreError> {
        let title = validate_title(&new.title)?;
        if self.get_household(new.household_id).await?.is_none() {
            return Err(ChoreError::NotFound(format!("household {}", new.household_id)));
        }
        self.require_member(new.household_id, new.created_by_id, "creator")
            .await?;
        if let Some(assignee) = new.assigned_to_id {
            self.require_member(new.household_id, assignee, "assignee")
                .await?;
        }

        let now = Utc::now();
        let mut tx = self.begin().await?;

        let id = sqlx::query(
            "INSERT INTO tasks \
             (household_id, title, description, assigned_to_id, created_by_id, due_date, \
              recurring, send_reminder, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.household_id)
        .bind(title)
        .bind(&new.description)
        .bind(new.assigned_to_id)
        .bind(new.created_by_id)
        .bind(new.due_date.as_ref().map(ts))
        .bind(new.recurring.as_str())
        .bind(new.send_reminder)
        .bind(ts(&now))
        .execute(&mut *tx)
        .await
        .map_err(|e| ChoreError::Store(format!("create task failed: {e}")))?
        .last_insert_rowid();

        record_activity(
            &mut *tx,
            &ActivityEntry {
                user_id: new.created_by_id,
                household_id: new.household_id,
                kind: ActivityKind::TaskCreated,
                task_id: Some(id),
                metadata: Some(json!({ "title": title })),
            },
            &now,
        )
        .await?;

        if let Some(assignee) = new.assigned_to_id {
            record_assignment(&mut *tx, new.household_id, new.created_by_id, assignee, id, title, &now)
                .await?;
        }

        let task = fetch_task(&mut *tx, id)
            .await?
            .ok_or_else(|| ChoreError::Store(format!("task {id} vanished after insert")))?;

        self.commit(tx).await?;
        info!("created task {id} '{title}' in household {}", new.household_id);
        Ok(task)
    }

    /// Apply a partial update. Reassigning logs an assignment and notifies
    /// the new assignee.
    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ChoreError> {
        let current = self
            .get_task(id)
            .await?
            .ok_or_else(|| ChoreError::NotFound(format!("task {id}")))?;

        let mut updated = current.clone();
        if let Some(title) = &patch.title {
            updated.title = validate_title(title)?.to_string();
        }
        if let Some(description) = &patch.description {
            updated.description = description.clone();
        }
        if let Some(assignee) = patch.assigned_to_id {
            updated.assigned_to_id = assignee;
        }
        if let Some(due) = patch.due_date {
            updated.due_date = due;
        }
        if let Some(recurring) = patch.recurring {
            updated.recurring = recurring;
        }
        if let Some(send_reminder) = patch.send_reminder {
            updated.send_reminder = send_reminder;
        }

        let actor = match patch.updated_by_id {
            Some(editor) => {
                self.require_member(current.household_id, editor, "editor")
                    .await?;
                editor
            }
            None => current.created_by_id,
        };
        let reassigned = match updated.assigned_to_id {
            Some(assignee) if updated.assigned_to_id != current.assigned_to_id => {
                self.require_member(current.household_id, assignee, "assignee")
                    .await?;
                Some(assignee)
            }
            _ => None,
        };

        let now = Utc::now();
        let mut tx = self.begin().await?;

        sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, assigned_to_id = ?, due_date = ?, \
             recurring = ?, send_reminder = ? WHERE id = ?",
        )
        .bind(&updated.title)
        .bind(&updated.description)
        .bind(updated.assigned_to_id)
        .bind(updated.due_date.as_ref().map(ts))
        .bind(updated.recurring.as_str())
        .bind(updated.send_reminder)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ChoreError::Store(format!("update task failed: {e}")))?;

        if let Some(assignee) = reassigned {
            record_assignment(
                &mut *tx,
                current.household_id,
                actor,
                assignee,
                id,
                &updated.title,
                &now,
            )
            .await?;
        }

        self.commit(tx).await?;
        Ok(updated)
    }

    /// Mark a task completed by `user_id` at `at`.
    ///
    /// A task completes exactly once; completing it again is a conflict.
    /// Recurring tasks spawn their next occurrence, due one interval after
    /// the old due date (or after `at` when the task had none).
    pub async fn complete_task(
        &self,
        id: TaskId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Completion, ChoreError> {
        let task = self
            .get_task(id)
            .await?
            .ok_or_else(|| ChoreError::NotFound(format!("task {id}")))?;
        if task.completed {
            return Err(ChoreError::Conflict(format!("task {id} is already completed")));
        }
        self.require_member(task.household_id, user_id, "completing user")
            .await?;

        let mut tx = self.begin().await?;

        let updated = sqlx::query(
            "UPDATE tasks SET completed = 1, completed_at = ?, completed_by_id = ? \
             WHERE id = ? AND completed = 0",
        )
        .bind(ts(&at))
        .bind(user_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ChoreError::Store(format!("complete task failed: {e}")))?
        .rows_affected();

        // A concurrent completion won between the check above and this update.
        // Dropping `tx` rolls back.
        if updated != 1 {
            return Err(ChoreError::Conflict(format!("task {id} is already completed")));
        }

        record_activity(
            &mut *tx,
            &ActivityEntry {
                user_id,
                household_id: task.household_id,
                kind: ActivityKind::TaskCompleted,
                task_id: Some(id),
                metadata: Some(json!({ "title": task.title })),
            },
            &at,
        )
        .await?;

        let next = match task.recurring.next_due(task.due_date.unwrap_or(at)) {
            Some(next_due) => Some(spawn_next(&mut *tx, &task, next_due, &at).await?),
            None => None,
        };

        let completed = fetch_task(&mut *tx, id)
            .await?
            .ok_or_else(|| ChoreError::Store(format!("task {id} vanished during completion")))?;

        self.commit(tx).await?;
        info!("task {id} completed by user {user_id}");
        Ok(Completion {
            task: completed,
            next,
        })
    }

    async fn require_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
        role: &str,
    ) -> Result<(), ChoreError> {
        if self.is_member(household_id, user_id).await? {
            Ok(())
        } else {
            Err(ChoreError::Validation(format!(
                "{role} {user_id} is not a member of household {household_id}"
            )))
        }
    }

    async fn acquire(
        &self,
    ) -> Result<sqlx::pool::PoolConnection<sqlx::Sqlite>, ChoreError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| ChoreError::Store(format!("acquire failed: {e}")))
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>, ChoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| ChoreError::Store(format!("begin failed: {e}")))
    }

    async fn commit(&self, tx: sqlx::Transaction<'static, sqlx::Sqlite>) -> Result<(), ChoreError> {
        tx.commit()
            .await
            .map_err(|e| ChoreError::Store(format!("commit failed: {e}")))
    }
}

fn validate_title(title: &str) -> Result<&str, ChoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ChoreError::Validation("task title must not be empty".into()));
    }
    Ok(title)
}

async fn fetch_task(conn: &mut SqliteConnection, id: TaskId) -> Result<Option<Task>, ChoreError> {
    let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| ChoreError::Store(format!("get task failed: {e}")))?;

    row.map(Task::try_from).transpose()
}

async fn record_assignment(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    actor: UserId,
    assignee: UserId,
    task_id: TaskId,
    title: &str,
    at: &DateTime<Utc>,
) -> Result<(), ChoreError> {
    record_activity(
        conn,
        &ActivityEntry {
            user_id: actor,
            household_id,
            kind: ActivityKind::TaskAssigned,
            task_id: Some(task_id),
            metadata: Some(json!({ "assignedToId": assignee, "title": title })),
        },
        at,
    )
    .await?;
    notify(
        conn,
        assignee,
        &format!("You were assigned \"{title}\""),
        Some(task_id),
        at,
    )
    .await
}

/// Insert the next occurrence of a recurring task.
async fn spawn_next(
    conn: &mut SqliteConnection,
    task: &Task,
    due: DateTime<Utc>,
    at: &DateTime<Utc>,
) -> Result<Task, ChoreError> {
    let id = sqlx::query(
        "INSERT INTO tasks \
         (household_id, title, description, assigned_to_id, created_by_id, due_date, \
          recurring, send_reminder, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(task.household_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.assigned_to_id)
    .bind(task.created_by_id)
    .bind(ts(&due))
    .bind(task.recurring.as_str())
    .bind(task.send_reminder)
    .bind(ts(at))
    .execute(&mut *conn)
    .await
    .map_err(|e| ChoreError::Store(format!("create next occurrence failed: {e}")))?
    .last_insert_rowid();

    record_activity(
        conn,
        &ActivityEntry {
            user_id: task.created_by_id,
            household_id: task.household_id,
            kind: ActivityKind::TaskCreated,
            task_id: Some(id),
            metadata: Some(json!({ "title": task.title, "recurringFrom": task.id })),
        },
        at,
    )
    .await?;

    info!(
        "task {} recurs {} as task {id}",
        task.id,
        task.recurring.as_str()
    );

    fetch_task(conn, id)
        .await?
        .ok_or_else(|| ChoreError::Store(format!("task {id} vanished after insert")))
}
