//! Per-household snapshot cache.
//!
//! Readers share one `Arc<Snapshot>` per household until a mutation
//! invalidates it; the next read reloads from the source.

use chore_core::{
    error::ChoreError,
    model::{HouseholdId, Snapshot},
    traits::SnapshotSource,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub struct SnapshotCache {
    source: Arc<dyn SnapshotSource>,
    entries: RwLock<Entries>,
}

/// Snapshots plus invalidation counters. A load that started before an
/// invalidation of its household must not be inserted afterwards.
#[derive(Default)]
struct Entries {
    snapshots: HashMap<HouseholdId, Arc<Snapshot>>,
    generations: HashMap<HouseholdId, u64>,
    epoch: u64,
}

impl Entries {
    fn stamp(&self, household_id: HouseholdId) -> (u64, u64) {
        (
            self.epoch,
            self.generations.get(&household_id).copied().unwrap_or(0),
        )
    }
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Cached snapshot for a household, loading it on a miss.
    pub async fn get(&self, household_id: HouseholdId) -> Result<Arc<Snapshot>, ChoreError> {
        let stamp = {
            let entries = self.entries.read().await;
            if let Some(snapshot) = entries.snapshots.get(&household_id) {
                debug!("snapshot cache hit for household {household_id}");
                return Ok(Arc::clone(snapshot));
            }
            entries.stamp(household_id)
        };

        // Loaded outside the lock. Concurrent misses may load twice.
        let snapshot = Arc::new(self.source.load_snapshot(household_id).await?);

        let mut entries = self.entries.write().await;
        if entries.stamp(household_id) == stamp {
            debug!(
                "snapshot cache loaded household {household_id} ({} tasks)",
                snapshot.tasks.len()
            );
            entries
                .snapshots
                .insert(household_id, Arc::clone(&snapshot));
        } else {
            debug!("household {household_id} invalidated during load, not caching");
        }
        Ok(snapshot)
    }

    /// Drop one household's snapshot. Returns whether one was cached.
    pub async fn invalidate(&self, household_id: HouseholdId) -> bool {
        let mut entries = self.entries.write().await;
        *entries.generations.entry(household_id).or_insert(0) += 1;
        entries.snapshots.remove(&household_id).is_some()
    }

    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        entries.epoch += 1;
        entries.snapshots.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.snapshots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chore_core::model::Household;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct CountingSource {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotSource for CountingSource {
        async fn load_snapshot(&self, household_id: HouseholdId) -> Result<Snapshot, ChoreError> {
            if household_id == 404 {
                return Err(ChoreError::NotFound(format!("household {household_id}")));
            }
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Snapshot {
                household: Household {
                    id: household_id,
                    name: format!("House {household_id}"),
                    description: None,
                    created_at: Utc::now(),
                },
                users: vec![],
                tasks: vec![],
                fetched_at: Utc::now(),
            })
        }
    }

    fn cache() -> (Arc<CountingSource>, SnapshotCache) {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let cache = SnapshotCache::new(source.clone());
        (source, cache)
    }

    #[tokio::test]
    async fn test_hit_shares_snapshot() {
        let (source, cache) = cache();
        let first = cache.get(1).await.unwrap();
        let second = cache.get(1).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let (source, cache) = cache();
        cache.get(1).await.unwrap();
        cache.get(2).await.unwrap();

        assert!(cache.invalidate(1).await);
        assert!(!cache.invalidate(1).await);
        assert_eq!(cache.len().await, 1);

        cache.get(1).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 3);

        cache.invalidate_all().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_error_is_not_cached() {
        let (_, cache) = cache();
        let err = cache.get(404).await.unwrap_err();
        assert!(matches!(err, ChoreError::NotFound(_)));
        assert!(cache.is_empty().await);
    }

    /// Blocks the first load until released; later loads return at once.
    /// The household name carries the version read when the load started.
    struct GatedSource {
        version: AtomicU64,
        loads: AtomicUsize,
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl SnapshotSource for GatedSource {
        async fn load_snapshot(&self, household_id: HouseholdId) -> Result<Snapshot, ChoreError> {
            let version = self.version.load(Ordering::SeqCst);
            if self.loads.fetch_add(1, Ordering::SeqCst) == 0 {
                self.started.notify_one();
                self.release.notified().await;
            }
            Ok(Snapshot {
                household: Household {
                    id: household_id,
                    name: format!("v{version}"),
                    description: None,
                    created_at: Utc::now(),
                },
                users: vec![],
                tasks: vec![],
                fetched_at: Utc::now(),
            })
        }
    }

    fn gated() -> (Arc<GatedSource>, Arc<SnapshotCache>) {
        let source = Arc::new(GatedSource {
            version: AtomicU64::new(0),
            loads: AtomicUsize::new(0),
            started: Notify::new(),
            release: Notify::new(),
        });
        let cache = Arc::new(SnapshotCache::new(source.clone()));
        (source, cache)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invalidate_during_load_discards_stale_snapshot() {
        let (source, cache) = gated();
        let reader = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get(1).await.unwrap() }
        });

        source.started.notified().await;
        // A mutation commits while the read is in flight.
        source.version.store(1, Ordering::SeqCst);
        assert!(!cache.invalidate(1).await);
        source.release.notify_one();

        let stale = reader.await.unwrap();
        assert_eq!(stale.household.name, "v0");
        assert!(cache.is_empty().await);

        let fresh = cache.get(1).await.unwrap();
        assert_eq!(fresh.household.name, "v1");
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
        assert!(Arc::ptr_eq(&fresh, &cache.get(1).await.unwrap()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invalidate_all_during_load_discards_stale_snapshot() {
        let (source, cache) = gated();
        let reader = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get(7).await.unwrap() }
        });

        source.started.notified().await;
        source.version.store(1, Ordering::SeqCst);
        cache.invalidate_all().await;
        source.release.notify_one();

        assert_eq!(reader.await.unwrap().household.name, "v0");
        assert_eq!(cache.get(7).await.unwrap().household.name, "v1");
        assert_eq!(cache.len().await, 1);
    }
}
