//! Shared wire/data types for `devport`.
//!
//! This crate is pure data plus the identity/pattern grammar. It performs no
//! I/O and owns no global state, so it can be depended on by the registry,
//! the scanner/orchestrator core, and the CLI without pulling in SQLite or
//! the filesystem.

pub mod config;
pub mod error;
pub mod identity;
pub mod record;

pub use config::{ProjectConfig, RawServiceConfig, ServiceConfig};
pub use error::DevportError;
pub use identity::{Identity, IdentityError, Pattern};
pub use record::{
    CleanupResult, ClaimOptions, ClaimResult, Endpoint, EnrichedService, FindOptions, FindResult,
    ReleaseOptions, ReleaseResult, ServiceStatus,
};
