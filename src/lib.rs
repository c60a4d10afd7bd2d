pub mod agent;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod query;
pub mod render;
pub mod server;
pub mod store;

pub use agent::Agent;
pub use config::AgentConfig;
pub use error::{AgentError, QueryError, StoreError};
pub use metrics::{Collector, CollectorSet, MetricKey, MetricValue, Sampler, Snapshot};
pub use query::{run_query, QueryParams, QueryResult, SnapshotQuery};
pub use store::{InMemoryStore, Retention, SnapshotStore};
