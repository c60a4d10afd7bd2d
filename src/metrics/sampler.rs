use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::select;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::collector::CollectorSet;
use super::types::Snapshot;
use crate::error::TickError;
use crate::store::SnapshotStore;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Periodic sample-and-store loop feeding a [`SnapshotStore`].
pub struct Sampler {
    collectors: CollectorSet,
    store: Arc<dyn SnapshotStore>,
    interval: Duration,
    cancel: CancellationToken,
}

impl Sampler {
    pub fn new(
        collectors: CollectorSet,
        store: Arc<dyn SnapshotStore>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Sampler {
            collectors,
            store,
            interval,
            cancel,
        }
    }

    /// Collects from every registered collector and saves the snapshot.
    /// Nothing is stored when any collector fails.
    pub async fn tick(&mut self) -> Result<Snapshot, TickError> {
        let started = Utc::now();
        let metrics = self.collectors.collect_all().await?;
        let snapshot = Snapshot::new(started, metrics);
        self.store.save(snapshot.clone()).await?;
        Ok(snapshot)
    }

    /// Runs until the cancellation token fires. The token is checked before
    /// each tick and while sleeping; a tick already in progress completes.
    pub async fn run(mut self) {
        info!(
            "collection loop started with {} collectors every {:?}",
            self.collectors.len(),
            self.interval
        );

        while !self.cancel.is_cancelled() {
            match self.tick().await {
                Ok(snapshot) => debug!("saved snapshot at {}", snapshot.timestamp),
                Err(TickError::Collector(err)) => warn!("discarding tick: {}", err),
                Err(TickError::Store(err)) => error!("failed to save snapshot: {}", err),
            }

            select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        info!("collection loop stopped");
    }

    pub fn spawn(self) -> SamplerHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());
        SamplerHandle {
            cancel,
            task: Some(task),
        }
    }
}

pub struct SamplerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signals the loop to stop and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!("collection loop task failed: {}", err);
            }
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
