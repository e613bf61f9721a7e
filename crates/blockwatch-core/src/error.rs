use thiserror::Error;

/// Failures surfaced by the blocking core
///
/// Only `InvalidArgument` and `Storage` ever reach a caller. `LookupFault`
/// and `ActuationFault` are produced at the seams and then logged and
/// swallowed by the engine and actuator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("policy lookup failed: {0}")]
    LookupFault(String),

    #[error("intervention failed: {0}")]
    ActuationFault(String),

    #[error("policy storage failed: {0}")]
    Storage(String),
}

impl BlockError {
    /// Stable code used on the policy control channel
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::LookupFault(_) => "LOOKUP_FAULT",
            Self::ActuationFault(_) => "ACTUATION_FAULT",
            Self::Storage(_) => "STORAGE",
        }
    }
}
