//! Interfaces for the out-of-scope collaborators: process spawning and
//! supervision, health probing, log multiplexing, and tunnelling. This
//! crate defines the seams only — no implementation ships here (spec
//! §8: Non-goals / interface stubs).

use anyhow::Result;
use async_trait::async_trait;

use devport_protocol::ServiceConfig;

/// Observed state of a supervised process.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessStatus {
    Running(u32),
    Stopped,
    Failed(String),
}

/// Spawns and supervises a service's OS process. Implementations live
/// outside this crate (local fork/exec, containers, remote agents, ...).
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Starts `id` according to `config`. Must be idempotent: calling
    /// spawn twice for an already-running service with the same config
    /// is a no-op.
    async fn spawn(&self, id: &str, config: &ServiceConfig) -> Result<()>;

    /// Stops `id`, escalating from a graceful signal to a forced kill.
    async fn stop(&self, id: &str) -> Result<()>;

    /// Current status as observed by this supervisor.
    async fn status(&self, id: &str) -> Result<ProcessStatus>;
}

/// The outcome of one health check.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Healthy,
    Unhealthy(String),
}

/// Probes a service's health endpoint over HTTP.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeOutcome>;
}

/// Consumes one service's output stream and multiplexes it alongside its
/// peers for interleaved display.
pub trait LogSink: Send + Sync {
    fn write_line(&self, service_id: &str, line: &str);
}

/// Exposes a local port through an externally reachable address.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    async fn open(&self, local_port: u16) -> Result<String>;
    async fn close(&self, local_port: u16) -> Result<()>;
}
