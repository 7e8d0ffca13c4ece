//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::{Diagnostic, DomainError};
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(e.into())
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::from(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::InterpreterNotFound { .. } => exitcode::UNAVAILABLE,
                InfraError::Execution { .. } => exitcode::SOFTWARE,
                InfraError::Application(e) => match e {
                    ApplicationError::Domain(DomainError::UnsupportedFormat(_)) => exitcode::USAGE,
                    ApplicationError::Domain(_) => exitcode::DATAERR,
                    ApplicationError::FlowNotFound(_) => exitcode::NOINPUT,
                    ApplicationError::InvalidJson { .. } => exitcode::DATAERR,
                    ApplicationError::OutputExists(_) => exitcode::CANTCREAT,
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => exitcode::IOERR,
                },
            },
        }
    }

    /// Validation problems carried by this error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CliError::Infra(InfraError::Application(ApplicationError::Domain(
                DomainError::InvalidFlow { diagnostics },
            ))) => diagnostics,
            _ => &[],
        }
    }
}
