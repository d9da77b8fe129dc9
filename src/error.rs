use std::process::ExitCode;

/// Errors that cause idiombot to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("puzzle source {source_name} unavailable: {message}")]
    ProviderUnavailable {
        source_name: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ExitError {
    pub fn provider(source_name: &str, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::from(2),
            Self::ProviderUnavailable { .. } => ExitCode::from(3),
            Self::Transport(_) => ExitCode::from(4),
        }
    }
}
