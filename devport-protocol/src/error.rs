use crate::identity::IdentityError;

/// Error taxonomy shared across the registry and orchestrator (spec §7).
///
/// Every public operation returns one of these instead of aborting the
/// process; the CLI is the only place that turns them into exit codes.
#[derive(Debug, thiserror::Error)]
pub enum DevportError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(#[from] IdentityError),

    #[error("{0}")]
    NotFound(String),

    #[error("No available ports in range")]
    Exhaustion,

    #[error("Unknown dependency: {0}")]
    MissingDep(String),

    #[error("Circular dependency: {0}")]
    Cycle(String),

    #[error("invalid duration literal: {0}")]
    InvalidDuration(String),

    #[error("storage error: {0}")]
    Storage(String),
}
