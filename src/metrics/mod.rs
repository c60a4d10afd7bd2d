mod collector;
mod cpu;
mod memory;
mod processes;
mod sampler;
mod system;
mod types;

pub use collector::{Collector, CollectorSet};
pub use cpu::CpuCollector;
pub use memory::MemoryCollector;
pub use processes::ProcessCollector;
pub use sampler::{Sampler, SamplerHandle, DEFAULT_INTERVAL};
pub use system::SystemCollector;
pub use types::{
    CpuStats, DiskUsage, LoadAverage, MemoryStats, MetricKey, MetricValue, NetworkInterface,
    ProcessRecord, Snapshot, SystemStats,
};
