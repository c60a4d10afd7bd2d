use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};
use tokio::time::sleep;

use super::collector::Collector;
use super::types::{CpuStats, MetricValue};
use crate::error::CollectorError;

const ROLLING_WINDOW: usize = 12;

struct RollingRange {
    window: VecDeque<f32>,
    window_size: usize,
}

impl RollingRange {
    fn new(window_size: usize) -> Self {
        RollingRange {
            window: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    fn record(&mut self, value: f32) -> (f32, f32) {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(value);
        self.window
            .iter()
            .fold((value, value), |(min, max), v| (min.min(*v), max.max(*v)))
    }
}

/// Samples overall and per-core CPU usage across a short measurement window.
pub struct CpuCollector {
    system: System,
    sample_window: Duration,
    range: RollingRange,
}

impl CpuCollector {
    pub fn new(sample_window: Duration) -> Self {
        CpuCollector {
            system: System::new(),
            sample_window: sample_window.max(MINIMUM_CPU_UPDATE_INTERVAL),
            range: RollingRange::new(ROLLING_WINDOW),
        }
    }
}

#[async_trait]
impl Collector for CpuCollector {
    async fn collect(&mut self) -> Result<MetricValue, CollectorError> {
        // usage is the delta between two refreshes
        self.system.refresh_cpu();
        sleep(self.sample_window).await;
        self.system.refresh_cpu();

        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(CollectorError::sample("cpu", "cpu list empty"));
        }

        let per_core_usage: Vec<f32> = cpus.iter().map(|cpu| cpu.cpu_usage()).collect();
        let total_usage = per_core_usage.iter().copied().sum::<f32>() / per_core_usage.len() as f32;
        let (rolling_min, rolling_max) = self.range.record(total_usage);

        Ok(MetricValue::Cpu(CpuStats {
            total_usage,
            core_count: cpus.len(),
            physical_core_count: self.system.physical_core_count().unwrap_or(0),
            brand: cpus
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_default(),
            frequency_mhz: cpus.first().map(|cpu| cpu.frequency()).unwrap_or_default(),
            per_core_usage,
            rolling_min,
            rolling_max,
        }))
    }
}
