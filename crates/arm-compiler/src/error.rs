//! Error types for arm-compiler

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unsupported compile target '{target}' (expected cursor, amazonq, copilot or markdown)")]
    UnsupportedTarget { target: String },

    #[error("Failed to compile {path}: {message}")]
    Compile { path: String, message: String },

    #[error("Failed to convert {path}: {message}")]
    Convert { path: String, message: String },

    #[error(transparent)]
    Fs(#[from] arm_fs::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn compile(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Compile {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
