//! Dependency resolution and environment derivation over a project's
//! service set (spec §4.4).

mod env_map;
mod normalize;
mod topo;

pub use env_map::{build_env_map, sanitize_key};
pub use normalize::normalize_service_config;
pub use topo::{resolve_dependencies, topological_sort};
