use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed output key of a registered collector.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKey {
    Cpu,
    Memory,
    Processes,
    System,
    Custom(String),
}

impl MetricKey {
    pub fn as_str(&self) -> &str {
        match self {
            MetricKey::Cpu => "cpu",
            MetricKey::Memory => "memory",
            MetricKey::Processes => "processes",
            MetricKey::System => "system",
            MetricKey::Custom(name) => name,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    pub total_usage: f32,
    pub per_core_usage: Vec<f32>,
    pub core_count: usize,
    pub physical_core_count: usize,
    pub brand: String,
    pub frequency_mhz: u64,
    pub rolling_min: f32,
    pub rolling_max: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: f32,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
    pub pressure_state: String,
}

impl MemoryStats {
    pub fn pressure_state(pressure: f32) -> String {
        if pressure >= 90.0 {
            "critical".to_string()
        } else if pressure >= 75.0 {
            "high".to_string()
        } else if pressure >= 60.0 {
            "elevated".to_string()
        } else {
            "normal".to_string()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub cpu_usage: f32,
    pub memory: u64,
    pub virtual_memory: u64,
    pub status: String,
    pub parent_pid: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub name: String,
    pub mount_point: String,
    pub file_system: String,
    pub kind: String,
    pub total_space: u64,
    pub available_space: u64,
    pub used_space: u64,
    pub used_percent: f32,
    pub is_removable: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub mac_address: String,
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
    pub received_packets: u64,
    pub transmitted_packets: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub arch: String,
    pub uptime_seconds: u64,
    pub boot_time_seconds: u64,
    pub load_average: LoadAverage,
    pub disks: Vec<DiskUsage>,
    pub networks: Vec<NetworkInterface>,
}

/// Payload produced by one collector for one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Cpu(CpuStats),
    Memory(MemoryStats),
    Processes(Vec<ProcessRecord>),
    System(SystemStats),
    Extension(serde_json::Value),
}

/// One timestamped aggregation of every collector's output for a single tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<String, MetricValue>,
}

impl Snapshot {
    pub fn new(timestamp: DateTime<Utc>, metrics: BTreeMap<String, MetricValue>) -> Self {
        Snapshot { timestamp, metrics }
    }

    pub fn get(&self, key: &MetricKey) -> Option<&MetricValue> {
        self.metrics.get(key.as_str())
    }
}
