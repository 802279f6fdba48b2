use crate::{
    error::ChoreError,
    model::{HouseholdId, Snapshot},
};
use async_trait::async_trait;

/// Anything that can produce the full current state of a household.
///
/// The SQLite store implements this; the snapshot cache sits in front of it.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Load household, roster, and tasks in one consistent read.
    async fn load_snapshot(&self, household_id: HouseholdId) -> Result<Snapshot, ChoreError>;
}
