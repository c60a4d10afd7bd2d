use async_trait::async_trait;
use sysinfo::System;

use super::collector::Collector;
use super::types::{MemoryStats, MetricValue};
use crate::error::CollectorError;

/// Reads physical memory and swap totals.
pub struct MemoryCollector {
    system: System,
}

impl MemoryCollector {
    pub fn new() -> Self {
        MemoryCollector {
            system: System::new(),
        }
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for MemoryCollector {
    async fn collect(&mut self) -> Result<MetricValue, CollectorError> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            return Err(CollectorError::sample("memory", "total memory reported as zero"));
        }

        Ok(MetricValue::Memory(memory_stats(
            total,
            self.system.available_memory(),
            self.system.free_memory(),
            self.system.total_swap(),
            self.system.used_swap(),
            self.system.free_swap(),
        )))
    }
}

fn memory_stats(
    total: u64,
    available: u64,
    free: u64,
    swap_total: u64,
    swap_used: u64,
    swap_free: u64,
) -> MemoryStats {
    let used = total.saturating_sub(available);
    let used_percent = if total > 0 {
        (used as f64 / total as f64 * 100.0) as f32
    } else {
        0.0
    };

    MemoryStats {
        total,
        available,
        used,
        free,
        used_percent,
        swap_total,
        swap_used,
        swap_free,
        pressure_state: MemoryStats::pressure_state(used_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_is_derived_from_available() {
        let stats = memory_stats(1_000, 250, 100, 0, 0, 0);
        assert_eq!(stats.used, 750);
        assert!((stats.used_percent - 75.0).abs() < f32::EPSILON);
        assert_eq!(stats.pressure_state, "high");
    }

    #[test]
    fn available_above_total_saturates() {
        let stats = memory_stats(100, 200, 200, 0, 0, 0);
        assert_eq!(stats.used, 0);
        assert_eq!(stats.pressure_state, "normal");
    }

    #[test]
    fn pressure_thresholds() {
        assert_eq!(MemoryStats::pressure_state(59.9), "normal");
        assert_eq!(MemoryStats::pressure_state(60.0), "elevated");
        assert_eq!(MemoryStats::pressure_state(89.0), "high");
        assert_eq!(MemoryStats::pressure_state(95.0), "critical");
    }
}
