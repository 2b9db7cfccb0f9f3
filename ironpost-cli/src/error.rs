//! CLI-specific error types and exit code mapping

use ironpost_core::error::IronpostError;
use ironpost_indexer::IndexerError;
use ironpost_vulnstore::VulnStoreError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// An input file could not be decoded.
    #[error("invalid input {path}: {reason}")]
    Input { path: String, reason: String },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from ironpost-core.
    #[error("{0}")]
    Core(#[from] IronpostError),

    /// The operation was interrupted (Ctrl-C).
    #[error("interrupted")]
    Interrupted,
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | General / command error               |
    /// | 2    | Configuration error                   |
    /// | 3    | Invalid input file                    |
    /// | 10   | IO error                              |
    /// | 130  | Interrupted                           |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(IronpostError::Config(_)) => 2,
            Self::Input { .. } => 3,
            Self::Io(_) | Self::Core(IronpostError::Io(_)) => 10,
            Self::Interrupted => 130,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<VulnStoreError> for CliError {
    fn from(e: VulnStoreError) -> Self {
        match e {
            VulnStoreError::Cancelled { .. } => Self::Interrupted,
            other => Self::Core(other.into()),
        }
    }
}

impl From<IndexerError> for CliError {
    fn from(e: IndexerError) -> Self {
        match e {
            IndexerError::Cancelled => Self::Interrupted,
            IndexerError::Store(inner) => inner.into(),
            other => Self::Core(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironpost_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err = CliError::Core(IronpostError::Config(ConfigError::FileNotFound {
            path: "missing.toml".to_owned(),
        }));
        assert_eq!(err.exit_code(), 2, "core config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_input_error() {
        let err = CliError::Input {
            path: "records.json".to_owned(),
            reason: "expected array".to_owned(),
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("records.json"));
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
    }

    #[test]
    fn test_store_cancel_maps_to_interrupted() {
        let err: CliError = VulnStoreError::Cancelled { stage: "acquire" }.into();
        assert!(matches!(err, CliError::Interrupted));
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_store_error_maps_to_core() {
        let err: CliError = VulnStoreError::Commit("disk I/O error".to_owned()).into();
        assert!(matches!(err, CliError::Core(IronpostError::Storage(_))));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_indexer_store_error_unwraps() {
        let err: CliError = IndexerError::Store(VulnStoreError::Cancelled { stage: "begin" }).into();
        assert!(matches!(err, CliError::Interrupted));
    }

    #[test]
    fn test_unknown_scanner_is_config_error() {
        let err: CliError = IndexerError::UnknownScanner("alpine".to_owned()).into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(format!("{}", err), "execution failed");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let cli_err: CliError = io_err.into();
        match cli_err {
            CliError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("expected Io error variant"),
        }
    }
}
