//! Infrastructure-level errors (wraps application errors)

use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;

/// Failures of the process environment around the services: the working
/// directory and the config files the CLI creates.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("cannot resolve working directory for config lookup")]
    WorkingDirectory(#[source] std::io::Error),

    #[error("config already exists: {}", .0.display())]
    ConfigExists(PathBuf),

    #[error("cannot write config {}", path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InfraError {
    pub fn config_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigWrite {
            path: path.into(),
            source,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn given_config_write_failure_when_displayed_then_names_path_and_keeps_source() {
        let err = InfraError::config_write(
            "/ro/.morphaug.toml",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        );

        assert_eq!(err.to_string(), "cannot write config /ro/.morphaug.toml");
        assert_eq!(err.source().map(|s| s.to_string()), Some("read-only".into()));
    }
}
