use thiserror::Error;

/// Failure taxonomy of the pre-processor.
///
/// `InvalidInput` and `Io` are surfaced up to the command line and converted
/// to process exit codes. `OracleFailure` and `ConsistencyViolation` are
/// fatal: the second one indicates corrupted connectivity data and continuing
/// would silently corrupt everything downstream.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed mesh file, unknown element type or unsupported format
    /// version.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The partitioning or reordering oracle returned a non-OK status.
    #[error("oracle failure: {0}")]
    OracleFailure(String),

    /// Internal connectivity data does not satisfy its own invariants.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
