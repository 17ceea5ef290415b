//! `ServiceConfig` — the orchestrator's input shape (spec §3, §6), plus the
//! legacy-alias raw form read from a project's `devport` config file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// As read from disk. Old and new key spellings may both be present; the
/// new spelling wins (spec §3: "new keys win when both are present").
/// Normalization into [`ServiceConfig`] is an orchestrator operation (spec
/// §4.4) — see `devport-core::orchestrator::normalize_service_config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawServiceConfig {
    pub cmd: Option<String>,
    /// Legacy alias for `cmd`.
    pub dev: Option<String>,

    pub port: Option<i64>,
    /// Legacy alias for `port`. `i64` (rather than `u16`) so that a
    /// explicit `port: 0` survives normalization distinctly from "absent".
    #[serde(rename = "preferredPort")]
    pub preferred_port: Option<i64>,

    #[serde(rename = "healthPath")]
    pub health_path: Option<String>,
    /// Legacy alias for `healthPath`.
    pub health: Option<String>,

    #[serde(default)]
    pub needs: Vec<String>,
    #[serde(rename = "noPort", default)]
    pub no_port: bool,
    pub remote: Option<String>,
    pub dir: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(rename = "_detected")]
    pub detected: Option<String>,
    #[serde(rename = "_identity")]
    pub identity: Option<String>,
}

/// The fully-populated, alias-resolved service definition the orchestrator
/// operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub cmd: Option<String>,
    /// `None` means "not configured"; `Some(0)` is a valid, preserved
    /// explicit zero port (spec §3: "Zero-valued port: 0 is preserved").
    pub port: Option<i64>,
    pub health_path: String,
    pub needs: Vec<String>,
    pub no_port: bool,
    pub remote: Option<String>,
    pub dir: Option<String>,
    pub env: BTreeMap<String, String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cmd: None,
            port: None,
            health_path: "/".to_string(),
            needs: Vec::new(),
            no_port: false,
            remote: None,
            dir: None,
            env: BTreeMap::new(),
        }
    }
}

/// A project-level config: `{project, services, portRange}` (spec §6).
///
/// `services` is an [`IndexMap`], not a `BTreeMap`: spec §4.4 requires
/// `topological_sort` to break ties by "the insertion order of the input
/// mapping", and a `BTreeMap` would silently re-sort services
/// alphabetically, discarding the order they were listed in on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: String,
    pub services: IndexMap<String, RawServiceConfig>,
    #[serde(rename = "portRange")]
    pub port_range: (u16, u16),
}
