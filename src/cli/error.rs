//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::WorkingDirectory(_) => crate::exitcode::IOERR,
                InfraError::ConfigExists(_) | InfraError::ConfigWrite { .. } => {
                    crate::exitcode::CANTCREAT
                }
                InfraError::Application(app) => app_exit_code(app),
            },
        }
    }
}

fn app_exit_code(err: &ApplicationError) -> i32 {
    match err {
        ApplicationError::Domain(_) => crate::exitcode::DATAERR,
        ApplicationError::InvalidReconstruction { .. } => crate::exitcode::DATAERR,
        ApplicationError::NoInputs(_) => crate::exitcode::NOINPUT,
        ApplicationError::Config { .. } => crate::exitcode::CONFIG,
        ApplicationError::OperationFailed { source, .. } => {
            match source.downcast_ref::<std::io::Error>() {
                Some(io) if io.kind() == std::io::ErrorKind::NotFound => {
                    crate::exitcode::NOINPUT
                }
                Some(_) => crate::exitcode::IOERR,
                None => crate::exitcode::SOFTWARE,
            }
        }
    }
}
