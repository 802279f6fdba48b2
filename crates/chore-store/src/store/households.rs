//! Users, households, memberships, and snapshot loading.

use super::rows::{convert_all, ts, HouseholdRow, MemberRow, TaskRow, UserRow};
use super::Store;
use async_trait::async_trait;
use chore_core::{
    error::ChoreError,
    model::{
        Household, HouseholdId, Member, NewHousehold, NewMember, NewUser, Snapshot, User, UserId,
    },
    traits::SnapshotSource,
};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

const MEMBER_COLUMNS: &str = "u.id, u.username, u.first_name, u.last_name, u.email, u.avatar, \
     m.is_admin, m.joined_at";

impl Store {
    /// Register a user. Usernames are unique.
    pub async fn create_user(&self, new: &NewUser) -> Result<User, ChoreError> {
        let username = new.username.trim();
        if username.is_empty() {
            return Err(ChoreError::Validation("username must not be empty".into()));
        }
        if new.first_name.trim().is_empty() {
            return Err(ChoreError::Validation("first name must not be empty".into()));
        }

        let taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ChoreError::Store(format!("username check failed: {e}")))?;
        if taken.is_some() {
            return Err(ChoreError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }

        let id = sqlx::query(
            "INSERT INTO users (username, first_name, last_name, email, avatar) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(new.first_name.trim())
        .bind(new.last_name.trim())
        .bind(new.email.trim())
        .bind(&new.avatar)
        .execute(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("create user failed: {e}")))?
        .last_insert_rowid();

        self.get_user(id)
            .await?
            .ok_or_else(|| ChoreError::Store(format!("user {id} vanished after insert")))
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>, ChoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, first_name, last_name, email, avatar FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("get user failed: {e}")))?;

        Ok(row.map(User::from))
    }

    /// Create a household; `created_by_id`, when set, joins it as admin.
    pub async fn create_household(&self, new: &NewHousehold) -> Result<Household, ChoreError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(ChoreError::Validation(
                "household name must not be empty".into(),
            ));
        }
        if let Some(creator) = new.created_by_id {
            if self.get_user(creator).await?.is_none() {
                return Err(ChoreError::NotFound(format!("user {creator}")));
            }
        }

        let now = ts(&Utc::now());
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ChoreError::Store(format!("begin failed: {e}")))?;

        let id = sqlx::query(
            "INSERT INTO households (name, description, created_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(&new.description)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| ChoreError::Store(format!("create household failed: {e}")))?
        .last_insert_rowid();

        if let Some(creator) = new.created_by_id {
            insert_membership(&mut *tx, id, creator, true, &now).await?;
        }

        tx.commit()
            .await
            .map_err(|e| ChoreError::Store(format!("commit failed: {e}")))?;

        info!("created household {id} '{name}'");

        self.get_household(id)
            .await?
            .ok_or_else(|| ChoreError::Store(format!("household {id} vanished after insert")))
    }

    pub async fn get_household(&self, id: HouseholdId) -> Result<Option<Household>, ChoreError> {
        let row: Option<HouseholdRow> = sqlx::query_as(
            "SELECT id, name, description, created_at FROM households WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("get household failed: {e}")))?;

        row.map(Household::try_from).transpose()
    }

    pub async fn list_households(&self) -> Result<Vec<Household>, ChoreError> {
        let rows: Vec<HouseholdRow> = sqlx::query_as(
            "SELECT id, name, description, created_at FROM households ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("list households failed: {e}")))?;

        convert_all(rows)
    }

    /// Add a user to a household.
    pub async fn add_member(
        &self,
        household_id: HouseholdId,
        new: &NewMember,
    ) -> Result<Member, ChoreError> {
        if self.get_household(household_id).await?.is_none() {
            return Err(ChoreError::NotFound(format!("household {household_id}")));
        }
        if self.get_user(new.user_id).await?.is_none() {
            return Err(ChoreError::NotFound(format!("user {}", new.user_id)));
        }
        if self.is_member(household_id, new.user_id).await? {
            return Err(ChoreError::Conflict(format!(
                "user {} is already a member of household {household_id}",
                new.user_id
            )));
        }

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ChoreError::Store(format!("acquire failed: {e}")))?;
        insert_membership(&mut *conn, household_id, new.user_id, new.is_admin, &ts(&Utc::now()))
            .await?;
        drop(conn);

        info!("user {} joined household {household_id}", new.user_id);

        self.members(household_id)
            .await?
            .into_iter()
            .find(|m| m.user.id == new.user_id)
            .ok_or_else(|| ChoreError::Store("membership vanished after insert".into()))
    }

    pub async fn is_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<bool, ChoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM memberships WHERE household_id = ? AND user_id = ?",
        )
        .bind(household_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("membership check failed: {e}")))?;

        Ok(row.is_some())
    }

    /// Household roster, ordered by join time.
    pub async fn members(&self, household_id: HouseholdId) -> Result<Vec<Member>, ChoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ChoreError::Store(format!("acquire failed: {e}")))?;
        fetch_members(&mut *conn, household_id).await
    }
}

async fn insert_membership(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    user_id: UserId,
    is_admin: bool,
    joined_at: &str,
) -> Result<(), ChoreError> {
    sqlx::query(
        "INSERT INTO memberships (user_id, household_id, is_admin, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(household_id)
    .bind(is_admin)
    .bind(joined_at)
    .execute(conn)
    .await
    .map_err(|e| ChoreError::Store(format!("add member failed: {e}")))?;
    Ok(())
}

async fn fetch_members(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
) -> Result<Vec<Member>, ChoreError> {
    let rows: Vec<MemberRow> = sqlx::query_as(&format!(
        "SELECT {MEMBER_COLUMNS} FROM memberships m \
         JOIN users u ON u.id = m.user_id \
         WHERE m.household_id = ? \
         ORDER BY m.joined_at ASC, u.id ASC"
    ))
    .bind(household_id)
    .fetch_all(conn)
    .await
    .map_err(|e| ChoreError::Store(format!("list members failed: {e}")))?;

    convert_all(rows)
}

#[async_trait]
impl SnapshotSource for Store {
    async fn load_snapshot(&self, household_id: HouseholdId) -> Result<Snapshot, ChoreError> {
        // One transaction so roster and tasks come from the same state.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ChoreError::Store(format!("begin failed: {e}")))?;

        let household: HouseholdRow = sqlx::query_as(
            "SELECT id, name, description, created_at FROM households WHERE id = ?",
        )
        .bind(household_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| ChoreError::Store(format!("load household failed: {e}")))?
        .ok_or_else(|| ChoreError::NotFound(format!("household {household_id}")))?;

        let members = fetch_members(&mut *tx, household_id).await?;

        let tasks: Vec<TaskRow> = sqlx::query_as(
            "SELECT * FROM tasks WHERE household_id = ? ORDER BY id ASC",
        )
        .bind(household_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| ChoreError::Store(format!("load tasks failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| ChoreError::Store(format!("commit failed: {e}")))?;

        Ok(Snapshot {
            household: household.try_into()?,
            users: members.into_iter().map(|m| m.user).collect(),
            tasks: convert_all(tasks)?,
            fetched_at: Utc::now(),
        })
    }
}
