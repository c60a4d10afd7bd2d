use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use super::cpu::CpuCollector;
use super::memory::MemoryCollector;
use super::processes::ProcessCollector;
use super::system::SystemCollector;
use super::types::{MetricKey, MetricValue};
use crate::config::CollectorSettings;
use crate::error::CollectorError;

/// A source that produces one metric value per tick, or fails.
#[async_trait]
pub trait Collector: Send {
    async fn collect(&mut self) -> Result<MetricValue, CollectorError>;
}

struct Registration {
    key: MetricKey,
    collector: Box<dyn Collector>,
}

/// Collectors paired with their output key, sampled in registration order.
#[derive(Default)]
pub struct CollectorSet {
    entries: Vec<Registration>,
}

impl CollectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the built-in collectors enabled in `settings`, in the fixed
    /// order cpu, memory, processes, system.
    pub fn from_settings(settings: &CollectorSettings) -> Self {
        let mut set = CollectorSet::new();
        if settings.cpu {
            let window = Duration::from_millis(settings.cpu_sample_window_ms);
            set.register(MetricKey::Cpu, CpuCollector::new(window));
        }
        if settings.memory {
            set.register(MetricKey::Memory, MemoryCollector::new());
        }
        if settings.processes {
            set.register(
                MetricKey::Processes,
                ProcessCollector::new(settings.process_limit),
            );
        }
        if settings.system {
            set.register(MetricKey::System, SystemCollector::new());
        }
        set
    }

    /// Adds a collector at the end of the sampling order. A collector whose
    /// output key is already taken replaces the earlier entry in place, so
    /// `Custom("cpu")` replaces the built-in cpu collector.
    pub fn register<C>(&mut self, key: MetricKey, collector: C) -> &mut Self
    where
        C: Collector + 'static,
    {
        let collector: Box<dyn Collector> = Box::new(collector);
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.key.as_str() == key.as_str())
        {
            Some(entry) => {
                entry.key = key;
                entry.collector = collector;
            }
            None => self.entries.push(Registration { key, collector }),
        }
        self
    }

    pub fn keys(&self) -> Vec<MetricKey> {
        self.entries.iter().map(|entry| entry.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every collector once. The first failure aborts the aggregation and
    /// no partial map is returned.
    pub async fn collect_all(&mut self) -> Result<BTreeMap<String, MetricValue>, CollectorError> {
        let mut aggregated = BTreeMap::new();
        for entry in self.entries.iter_mut() {
            let value = entry.collector.collect().await?;
            debug!("collected {}", entry.key);
            aggregated.insert(entry.key.as_str().to_string(), value);
        }
        Ok(aggregated)
    }
}
