//! Weekly summary records, keyed by ISO week.
//!
//! The dashboard trend compares the live summary against the most recent
//! record from an earlier week.

use super::rows::{ts, SummaryRow};
use super::Store;
use chore_core::{error::ChoreError, model::HouseholdId};
use chore_stats::HouseholdSummary;
use chrono::{DateTime, Datelike, Utc};
use tracing::debug;

/// ISO week key, e.g. `2026-W07`.
pub fn week_key(at: &DateTime<Utc>) -> String {
    let week = at.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

impl Store {
    /// Record (or overwrite) the summary for the ISO week containing `at`.
    pub async fn record_weekly_summary(
        &self,
        household_id: HouseholdId,
        summary: &HouseholdSummary,
        at: DateTime<Utc>,
    ) -> Result<(), ChoreError> {
        let week = week_key(&at);
        sqlx::query(
            "INSERT INTO weekly_summaries \
             (household_id, week, total, completed_count, pending_count, weekly_progress, \
              unassigned_count, recorded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(household_id, week) DO UPDATE SET \
               total = excluded.total, \
               completed_count = excluded.completed_count, \
               pending_count = excluded.pending_count, \
               weekly_progress = excluded.weekly_progress, \
               unassigned_count = excluded.unassigned_count, \
               recorded_at = excluded.recorded_at",
        )
        .bind(household_id)
        .bind(&week)
        .bind(summary.total as i64)
        .bind(summary.completed_count as i64)
        .bind(summary.pending_count as i64)
        .bind(i64::from(summary.weekly_progress))
        .bind(summary.unassigned_count as i64)
        .bind(ts(&at))
        .execute(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("record weekly summary failed: {e}")))?;

        debug!("recorded summary for household {household_id} week {week}");
        Ok(())
    }

    /// Latest summary recorded for a week before the one containing `at`.
    pub async fn previous_weekly_summary(
        &self,
        household_id: HouseholdId,
        at: DateTime<Utc>,
    ) -> Result<Option<HouseholdSummary>, ChoreError> {
        let row: Option<SummaryRow> = sqlx::query_as(
            "SELECT total, completed_count, pending_count, weekly_progress, unassigned_count \
             FROM weekly_summaries \
             WHERE household_id = ? AND week < ? \
             ORDER BY week DESC LIMIT 1",
        )
        .bind(household_id)
        .bind(week_key(&at))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("previous weekly summary failed: {e}")))?;

        Ok(row.map(HouseholdSummary::from))
    }

    /// Row counts for the status command: households, users, tasks.
    pub async fn counts(&self) -> Result<(i64, i64, i64), ChoreError> {
        sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM households), \
                    (SELECT COUNT(*) FROM users), \
                    (SELECT COUNT(*) FROM tasks)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ChoreError::Store(format!("count query failed: {e}")))
    }
}
