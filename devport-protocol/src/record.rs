//! Registry data model: the persisted `ServiceRecord`/`Endpoint` shape and
//! the request/response types for the public registry contract (spec §3,
//! §4.1). These are plain data — the storage engine lives in
//! `devport-registry`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PORT_RANGE: (u16, u16) = (3100, 9999);
pub const RESERVED_PORTS: [u16; 3] = [8080, 8000, 9876];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Assigned,
    Running,
    Stopped,
    Failed,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Assigned => "assigned",
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ServiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(ServiceStatus::Assigned),
            "running" => Ok(ServiceStatus::Running),
            "stopped" => Ok(ServiceStatus::Stopped),
            "failed" => Ok(ServiceStatus::Failed),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// `(service_id, env, url)` — unique per `(service_id, env)`, cascades on
/// service release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub service_id: String,
    pub env: String,
    pub url: String,
}

pub const LOCAL_ENV: &str = "local";

impl Endpoint {
    pub fn local(service_id: impl Into<String>, port: u16) -> Self {
        Self {
            service_id: service_id.into(),
            env: LOCAL_ENV.to_string(),
            url: format!("http://localhost:{port}"),
        }
    }
}

/// Options accepted by `claim`. `range` defaults to
/// [`DEFAULT_PORT_RANGE`] and `expires` is a duration literal such as
/// `"1h"` (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct ClaimOptions {
    pub port: Option<u16>,
    pub range: Option<(u16, u16)>,
    pub pid: Option<u32>,
    pub cmd: Option<String>,
    pub cwd: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub expires: Option<String>,
}

impl ClaimOptions {
    pub fn range_or_default(&self) -> (u16, u16) {
        self.range.unwrap_or(DEFAULT_PORT_RANGE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimResult {
    pub id: String,
    pub port: u16,
    pub status: ServiceStatus,
    /// True if an existing, non-expired record for this identity was
    /// reused instead of allocating fresh (idempotent claim).
    pub existing: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseResult {
    pub released: usize,
    /// Populated only when exactly one record was released.
    pub port: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub status: Option<ServiceStatus>,
    pub port: Option<u16>,
    pub expired: Option<bool>,
    pub limit: Option<usize>,
}

/// A `ServiceRecord` enriched with its resolved endpoint URLs, as returned
/// by `find`/`get` (spec §4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedService {
    pub id: String,
    pub port: Option<u16>,
    pub status: ServiceStatus,
    pub pid: Option<u32>,
    pub cmd: Option<String>,
    pub cwd: Option<String>,
    pub created_at: i64,
    pub last_seen: i64,
    pub expires_at: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub urls: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindResult {
    pub count: usize,
    pub services: Vec<EnrichedService>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupResult {
    pub cleaned: usize,
}
