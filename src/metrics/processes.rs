use std::thread;

use async_trait::async_trait;
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};
use tokio::task;

use super::collector::Collector;
use super::types::{MetricValue, ProcessRecord};
use crate::error::CollectorError;

/// Enumerates running processes, largest resident memory first.
///
/// The `System` is kept between ticks: per-process CPU usage is the delta
/// between two refreshes.
pub struct ProcessCollector {
    limit: Option<usize>,
    system: Option<System>,
}

impl ProcessCollector {
    pub fn new(limit: Option<usize>) -> Self {
        ProcessCollector {
            limit,
            system: None,
        }
    }
}

#[async_trait]
impl Collector for ProcessCollector {
    async fn collect(&mut self) -> Result<MetricValue, CollectorError> {
        let system = self.system.take();
        let (system, mut records) = task::spawn_blocking(move || capture_processes(system))
            .await
            .map_err(|source| CollectorError::Join {
                key: "processes".to_string(),
                source,
            })?;
        self.system = Some(system);

        if records.is_empty() {
            return Err(CollectorError::sample("processes", "no processes visible"));
        }

        sort_and_truncate(&mut records, self.limit);
        Ok(MetricValue::Processes(records))
    }
}

fn capture_processes(system: Option<System>) -> (System, Vec<ProcessRecord>) {
    let system = match system {
        Some(mut system) => {
            system.refresh_processes();
            system
        }
        None => {
            // First tick: take a baseline so usage is not reported as zero.
            let mut system = System::new();
            system.refresh_processes();
            thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
            system.refresh_processes();
            system
        }
    };

    let records = system
        .processes()
        .iter()
        .map(|(pid, process)| ProcessRecord {
            pid: pid.as_u32(),
            name: process.name().to_string(),
            cpu_usage: process.cpu_usage(),
            memory: process.memory(),
            virtual_memory: process.virtual_memory(),
            status: format!("{:?}", process.status()),
            parent_pid: process.parent().map(|p| p.as_u32()),
        })
        .collect();
    (system, records)
}

fn sort_and_truncate(records: &mut Vec<ProcessRecord>, limit: Option<usize>) {
    records.sort_by(|a, b| b.memory.cmp(&a.memory).then(a.pid.cmp(&b.pid)));
    if let Some(limit) = limit {
        records.truncate(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn record(pid: u32, memory: u64) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: format!("proc-{pid}"),
            cpu_usage: 0.0,
            memory,
            virtual_memory: memory * 2,
            status: "Run".to_string(),
            parent_pid: None,
        }
    }

    #[test]
    fn sorts_by_memory_then_pid() {
        let mut records = vec![record(3, 10), record(1, 30), record(2, 10)];
        sort_and_truncate(&mut records, None);
        let pids: Vec<u32> = records.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![1, 2, 3]);
    }

    #[test]
    fn limit_keeps_largest() {
        let mut records = vec![record(1, 5), record(2, 50), record(3, 20)];
        sort_and_truncate(&mut records, Some(2));
        let pids: Vec<u32> = records.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn busy_process_reports_cpu_usage() {
        let stop = Arc::new(AtomicBool::new(false));
        let spinner = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let mut n: u64 = 0;
                while !stop.load(Ordering::Relaxed) {
                    n = std::hint::black_box(n.wrapping_add(1));
                }
            })
        };

        let mut collector = ProcessCollector::new(None);
        let own_pid = std::process::id();
        let mut usages = Vec::new();
        for _ in 0..2 {
            let MetricValue::Processes(records) = collector.collect().await.unwrap() else {
                panic!("expected a process list");
            };
            let own = records.iter().find(|r| r.pid == own_pid).map(|r| r.cpu_usage);
            usages.push(own.expect("test process missing from the list"));
            tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
        }

        stop.store(true, Ordering::Relaxed);
        spinner.join().unwrap();
        assert!(usages.iter().all(|usage| *usage > 0.0), "usages: {usages:?}");
    }
}
