use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use log::info;
use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::metrics::{CollectorSet, MetricValue, Sampler};
use crate::server::{AppState, MetricsServer};
use crate::store::{InMemoryStore, SnapshotStore};

/// Ties the collectors, the snapshot store and the HTTP endpoint together.
pub struct Agent {
    config: AgentConfig,
    addr: SocketAddr,
    store: Arc<dyn SnapshotStore>,
    collectors: CollectorSet,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn SnapshotStore> = Arc::new(InMemoryStore::new(config.retention));
        let collectors = CollectorSet::from_settings(&config.collectors);
        Self::with_parts(config, store, collectors)
    }

    /// Builds an agent over a caller supplied store and collector set.
    pub fn with_parts(
        config: AgentConfig,
        store: Arc<dyn SnapshotStore>,
        collectors: CollectorSet,
    ) -> Result<Self> {
        let addr = config.socket_addr()?;
        Ok(Agent {
            config,
            addr,
            store,
            collectors,
        })
    }

    pub fn store(&self) -> Arc<dyn SnapshotStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Samples every collector once without storing the result.
    pub async fn collect_once(&mut self) -> Result<BTreeMap<String, MetricValue>> {
        Ok(self.collectors.collect_all().await?)
    }

    /// Runs the collection loop and the HTTP server until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let server = MetricsServer::bind(self.addr, AppState::new(Arc::clone(&self.store))).await?;
        info!(
            "agent starting, collectors {:?}, retention {:?}",
            self.collectors.keys(),
            self.config.retention
        );

        let sampler = Sampler::new(
            self.collectors,
            Arc::clone(&self.store),
            self.config.collection_interval(),
            cancel.child_token(),
        )
        .spawn();

        let served = server.serve(cancel.clone()).await;
        // the server only returns early on failure; stop sampling either way
        cancel.cancel();
        sampler.shutdown().await;
        served?;
        info!("agent stopped");
        Ok(())
    }
}
