//! Ordered snapshot history shared between the collection loop and readers.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::metrics::Snapshot;

/// How many snapshots a store keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    /// Keep every snapshot for the lifetime of the process.
    #[default]
    Unbounded,
    /// Keep at most this many snapshots, evicting the oldest first.
    Capacity(NonZeroUsize),
}

impl Retention {
    pub fn capacity(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Retention::Capacity)
    }
}

/// Append-only snapshot history.
///
/// Implementations must tolerate concurrent writers and readers; a read never
/// observes a partially applied `save`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Appends `snapshot` at the end of the history.
    async fn save(&self, snapshot: Snapshot) -> Result<(), StoreError>;

    /// Returns the full history, oldest first.
    async fn get_all(&self) -> Result<Vec<Snapshot>, StoreError>;

    /// Returns the snapshots with `from < timestamp < to`, in stored order.
    async fn query(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, StoreError>;

    /// Returns the last `n` snapshots (fewer if the history is shorter),
    /// oldest of the window first.
    async fn latest(&self, n: usize) -> Result<Vec<Snapshot>, StoreError>;

    async fn len(&self) -> Result<usize, StoreError>;
}

pub struct InMemoryStore {
    snapshots: RwLock<VecDeque<Snapshot>>,
    retention: Retention,
}

impl InMemoryStore {
    pub fn new(retention: Retention) -> Self {
        let snapshots = match retention {
            Retention::Unbounded => VecDeque::new(),
            Retention::Capacity(capacity) => VecDeque::with_capacity(capacity.get()),
        };
        InMemoryStore {
            snapshots: RwLock::new(snapshots),
            retention,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(Retention::Unbounded)
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn save(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        let mut guard = self.snapshots.write().await;
        if let Retention::Capacity(capacity) = self.retention {
            while guard.len() >= capacity.get() {
                guard.pop_front();
            }
        }
        guard.push_back(snapshot);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Snapshot>, StoreError> {
        let guard = self.snapshots.read().await;
        Ok(guard.iter().cloned().collect())
    }

    async fn query(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let guard = self.snapshots.read().await;
        Ok(guard
            .iter()
            .filter(|snapshot| snapshot.timestamp > from && snapshot.timestamp < to)
            .cloned()
            .collect())
    }

    async fn latest(&self, n: usize) -> Result<Vec<Snapshot>, StoreError> {
        let guard = self.snapshots.read().await;
        let start = guard.len().saturating_sub(n);
        Ok(guard.range(start..).cloned().collect())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.snapshots.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricValue;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn snapshot_at(secs: i64) -> Snapshot {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            "cpu".to_string(),
            MetricValue::Extension(serde_json::json!(secs)),
        );
        Snapshot::new(Utc.timestamp_opt(secs, 0).unwrap(), metrics)
    }

    fn seconds(snapshots: &[Snapshot]) -> Vec<i64> {
        snapshots.iter().map(|s| s.timestamp.timestamp()).collect()
    }

    #[tokio::test]
    async fn get_all_on_empty_store_is_empty() {
        let store = InMemoryStore::unbounded();
        assert!(store.get_all().await.unwrap().is_empty());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_all_preserves_insertion_order() {
        let store = InMemoryStore::unbounded();
        for secs in [5, 1, 3, 3] {
            store.save(snapshot_at(secs)).await.unwrap();
        }
        assert_eq!(seconds(&store.get_all().await.unwrap()), vec![5, 1, 3, 3]);
    }

    #[tokio::test]
    async fn query_excludes_both_bounds() {
        let store = InMemoryStore::unbounded();
        for secs in [100, 200, 300] {
            store.save(snapshot_at(secs)).await.unwrap();
        }
        let from = Utc.timestamp_opt(100, 0).unwrap();
        let to = Utc.timestamp_opt(300, 0).unwrap();
        assert_eq!(seconds(&store.query(from, to).await.unwrap()), vec![200]);
    }

    #[tokio::test]
    async fn query_without_match_is_empty_not_error() {
        let store = InMemoryStore::unbounded();
        store.save(snapshot_at(100)).await.unwrap();
        let from = Utc.timestamp_opt(500, 0).unwrap();
        let to = Utc.timestamp_opt(900, 0).unwrap();
        assert!(store.query(from, to).await.unwrap().is_empty());
        // inverted range
        assert!(store.query(to, from).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_keeps_duplicate_timestamps() {
        let store = InMemoryStore::unbounded();
        for secs in [10, 20, 20, 30] {
            store.save(snapshot_at(secs)).await.unwrap();
        }
        let from = Utc.timestamp_opt(10, 0).unwrap();
        let to = Utc.timestamp_opt(30, 0).unwrap();
        assert_eq!(seconds(&store.query(from, to).await.unwrap()), vec![20, 20]);
    }

    #[tokio::test]
    async fn latest_returns_tail_in_order() {
        let store = InMemoryStore::unbounded();
        assert!(store.latest(3).await.unwrap().is_empty());
        for secs in [1, 2, 3, 4] {
            store.save(snapshot_at(secs)).await.unwrap();
        }
        assert_eq!(seconds(&store.latest(2).await.unwrap()), vec![3, 4]);
        assert_eq!(seconds(&store.latest(10).await.unwrap()), vec![1, 2, 3, 4]);
        assert!(store.latest(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let store = InMemoryStore::new(Retention::capacity(2).unwrap());
        for secs in [1, 2, 3] {
            store.save(snapshot_at(secs)).await.unwrap();
        }
        assert_eq!(seconds(&store.get_all().await.unwrap()), vec![2, 3]);
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(Retention::capacity(0), None);
    }

    #[test]
    fn retention_serde_shape() {
        let unbounded = serde_json::to_value(Retention::Unbounded).unwrap();
        assert_eq!(unbounded, serde_json::json!("unbounded"));

        let capped: Retention = serde_json::from_str(r#"{"capacity": 5}"#).unwrap();
        assert_eq!(capped, Retention::capacity(5).unwrap());

        assert!(serde_json::from_str::<Retention>(r#"{"capacity": 0}"#).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_and_reads_are_consistent() {
        let store = Arc::new(InMemoryStore::unbounded());
        let writers: Vec<_> = (0..8)
            .map(|w| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for i in 0..50 {
                        store.save(snapshot_at(w * 1_000 + i)).await.unwrap();
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut last = 0;
                    for _ in 0..50 {
                        let len = store.get_all().await.unwrap().len();
                        assert!(len >= last, "history shrank from {last} to {len}");
                        assert!(len <= 400);
                        last = len;
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        // range readers over writer 0's window, 0 < t < 1000
        let queriers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let from = Utc.timestamp_opt(0, 0).unwrap();
                    let to = Utc.timestamp_opt(1_000, 0).unwrap();
                    let mut last = 0;
                    for _ in 0..50 {
                        let window = store.query(from, to).await.unwrap();
                        let secs = seconds(&window);
                        assert!(secs.iter().all(|s| *s > 0 && *s < 1_000));
                        // writer 0 saves in order, so its window is a sorted prefix
                        assert!(secs.windows(2).all(|pair| pair[0] < pair[1]));
                        assert!(secs.len() >= last);
                        last = secs.len();
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for handle in futures::future::join_all(writers).await {
            handle.unwrap();
        }
        for handle in futures::future::join_all(readers).await {
            handle.unwrap();
        }
        for handle in futures::future::join_all(queriers).await {
            handle.unwrap();
        }

        let from = Utc.timestamp_opt(0, 0).unwrap();
        let to = Utc.timestamp_opt(1_000, 0).unwrap();
        // writer 0 saved 0..50; t = 0 sits on the excluded bound
        assert_eq!(seconds(&store.query(from, to).await.unwrap()), (1..50).collect::<Vec<_>>());

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 400);
        let mut secs = seconds(&all);
        secs.sort_unstable();
        secs.dedup();
        assert_eq!(secs.len(), 400);
    }
}
