use std::path::Path;

use async_trait::async_trait;
use sysinfo::{DiskKind, Disks, Networks, System};
use tokio::task;

use super::collector::Collector;
use super::types::{DiskUsage, LoadAverage, MetricValue, NetworkInterface, SystemStats};
use crate::error::CollectorError;

/// Host summary: identity, uptime, load, disks and network counters.
#[derive(Default)]
pub struct SystemCollector;

impl SystemCollector {
    pub fn new() -> Self {
        SystemCollector
    }
}

#[async_trait]
impl Collector for SystemCollector {
    async fn collect(&mut self) -> Result<MetricValue, CollectorError> {
        let stats = task::spawn_blocking(capture_system)
            .await
            .map_err(|source| CollectorError::Join {
                key: "system".to_string(),
                source,
            })??;
        Ok(MetricValue::System(stats))
    }
}

fn capture_system() -> Result<SystemStats, CollectorError> {
    let disks = collect_disks();
    if disks.is_empty() {
        return Err(CollectorError::sample("system", "no disks discovered"));
    }

    let load = System::load_average();
    Ok(SystemStats {
        hostname: System::host_name().unwrap_or_default(),
        os_name: System::long_os_version().unwrap_or_default(),
        os_version: System::os_version().unwrap_or_default(),
        kernel_version: System::kernel_version().unwrap_or_default(),
        arch: std::env::consts::ARCH.to_string(),
        uptime_seconds: System::uptime(),
        boot_time_seconds: System::boot_time(),
        load_average: LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        },
        disks,
        networks: collect_networks(),
    })
}

fn collect_disks() -> Vec<DiskUsage> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .map(|disk| {
            let total_space = disk.total_space();
            let available_space = disk.available_space();
            let kind = match disk.kind() {
                DiskKind::SSD => "ssd",
                DiskKind::HDD => "hdd",
                DiskKind::Unknown(_) => "unknown",
            };
            disk_usage(
                disk.name().to_string_lossy().to_string(),
                disk.mount_point(),
                disk.file_system().to_string_lossy().to_string(),
                kind,
                total_space,
                available_space,
                disk.is_removable(),
            )
        })
        .collect()
}

fn disk_usage(
    name: String,
    mount_point: &Path,
    file_system: String,
    kind: &str,
    total_space: u64,
    available_space: u64,
    is_removable: bool,
) -> DiskUsage {
    let used_space = total_space.saturating_sub(available_space);
    let used_percent = if total_space > 0 {
        (used_space as f64 / total_space as f64 * 100.0) as f32
    } else {
        0.0
    };
    DiskUsage {
        name,
        mount_point: mount_point.to_string_lossy().to_string(),
        file_system,
        kind: kind.to_string(),
        total_space,
        available_space,
        used_space,
        used_percent,
        is_removable,
    }
}

fn collect_networks() -> Vec<NetworkInterface> {
    let networks = Networks::new_with_refreshed_list();
    let mut interfaces: Vec<NetworkInterface> = networks
        .iter()
        .map(|(name, data)| NetworkInterface {
            name: name.clone(),
            mac_address: data.mac_address().to_string(),
            received_bytes: data.total_received(),
            transmitted_bytes: data.total_transmitted(),
            received_packets: data.total_packets_received(),
            transmitted_packets: data.total_packets_transmitted(),
        })
        .collect();
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    interfaces
}
