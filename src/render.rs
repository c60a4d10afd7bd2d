use std::fmt::Write;

use bytesize::ByteSize;

use crate::metrics::{MetricValue, Snapshot};

const TOP_PROCESSES: usize = 5;

/// Renders snapshots as human readable text, oldest first.
pub fn render_snapshots(snapshots: &[Snapshot]) -> String {
    if snapshots.is_empty() {
        return "no snapshots in the requested window\n".to_string();
    }
    snapshots.iter().map(render_snapshot).collect::<Vec<_>>().join("\n")
}

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "snapshot {} (unix {})",
        snapshot.timestamp.to_rfc3339(),
        snapshot.timestamp.timestamp()
    );
    for (key, value) in &snapshot.metrics {
        render_value(&mut out, key, value);
    }
    out
}

fn render_value(out: &mut String, key: &str, value: &MetricValue) {
    match value {
        MetricValue::Cpu(cpu) => {
            let _ = writeln!(
                out,
                "  {:<10} {:.1}% across {} cores (min {:.1}%, max {:.1}%)",
                key, cpu.total_usage, cpu.core_count, cpu.rolling_min, cpu.rolling_max
            );
        }
        MetricValue::Memory(mem) => {
            let _ = writeln!(
                out,
                "  {:<10} {} / {} used ({:.1}%, {}), swap {} / {}",
                key,
                ByteSize(mem.used),
                ByteSize(mem.total),
                mem.used_percent,
                mem.pressure_state,
                ByteSize(mem.swap_used),
                ByteSize(mem.swap_total)
            );
        }
        MetricValue::Processes(processes) => {
            let _ = writeln!(out, "  {:<10} {} running", key, processes.len());
            for process in processes.iter().take(TOP_PROCESSES) {
                let _ = writeln!(
                    out,
                    "    {:>7} {:<24} {:>10} {:>5.1}%",
                    process.pid,
                    process.name,
                    ByteSize(process.memory).to_string(),
                    process.cpu_usage
                );
            }
        }
        MetricValue::System(system) => {
            let _ = writeln!(
                out,
                "  {:<10} {} ({} {}, {}) up {}s, load {:.2} {:.2} {:.2}",
                key,
                system.hostname,
                system.os_name,
                system.kernel_version,
                system.arch,
                system.uptime_seconds,
                system.load_average.one,
                system.load_average.five,
                system.load_average.fifteen
            );
            for disk in &system.disks {
                let _ = writeln!(
                    out,
                    "    {:<24} {} / {} ({:.1}%)",
                    disk.mount_point,
                    ByteSize(disk.used_space),
                    ByteSize(disk.total_space),
                    disk.used_percent
                );
            }
        }
        MetricValue::Extension(raw) => {
            let _ = writeln!(out, "  {:<10} {}", key, raw);
        }
    }
}
