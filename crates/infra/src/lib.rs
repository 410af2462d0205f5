//! Infrastructure layer: collaborator adapters, sinks, scheduling, config.

pub mod config;
pub mod runner;
pub mod sink;
pub mod sources;


pub use config::{ConfigLoadError, load_config, load_config_with};
pub use runner::{AnalyticsRunner, AnalyticsRunnerHandle, RunnerSources};
pub use sink::{InMemorySnapshotSink, JsonDirectorySink, SnapshotSink};
pub use sources::InMemoryInventorySource;
