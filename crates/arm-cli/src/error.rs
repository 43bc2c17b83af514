//! Error types for arm-cli

use arm_core::ErrorKind;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] arm_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Bad flag value or similar, caught before reaching the core
    #[error("{message}")]
    User { message: String },

    /// Some items of a batch verb failed; each was already printed
    #[error("{failed} of {total} item(s) failed")]
    Partial { failed: usize, total: usize },
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Tag printed in `error[<kind>]`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) => e.kind(),
            Self::Io(_) => ErrorKind::Io,
            Self::User { .. } => ErrorKind::InvalidConfig,
            Self::Partial { .. } => ErrorKind::Internal,
        }
    }
}

impl From<arm_compiler::Error> for CliError {
    fn from(e: arm_compiler::Error) -> Self {
        Self::Core(e.into())
    }
}

impl From<arm_meta::Error> for CliError {
    fn from(e: arm_meta::Error) -> Self {
        Self::Core(e.into())
    }
}

impl From<arm_registry::Error> for CliError {
    fn from(e: arm_registry::Error) -> Self {
        Self::Core(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_kind() {
        let error: CliError = arm_core::Error::not_found("sink", "cursor").into();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.to_string(), "sink 'cursor' not found");
    }

    #[test]
    fn user_errors_are_invalid_config() {
        assert_eq!(CliError::user("bad").kind(), ErrorKind::InvalidConfig);
    }
}
