//! Project scanning, dependency resolution, and configuration assembly
//! for `devport` — everything upstream of the registry that doesn't
//! touch SQLite (spec §4.3, §4.4).
//!
//! Process spawning, health probing, log multiplexing, and tunnelling
//! are out of scope here; [`collaborators`] defines the trait seams a
//! future crate would implement.

pub mod collaborators;
pub mod config_builder;
pub mod orchestrator;
pub mod scanner;

pub use collaborators::{HealthProbe, LogSink, ProbeOutcome, ProcessStatus, ProcessSupervisor, TunnelProvider};
pub use config_builder::build_config;
pub use orchestrator::{build_env_map, normalize_service_config, resolve_dependencies, sanitize_key, topological_sort};
pub use scanner::{scan, DiscoveredService, ProjectType, ScanResult};
