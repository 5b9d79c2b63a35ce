//! Crate-wide error types.
//!
//! Pipeline stages that can genuinely fail (provider calls, config loading)
//! return [`StudioError`]. Stages contracted to never fail — extraction,
//! validation scoring, the escalation ladder as a whole — do not appear
//! here; they encode degraded outcomes in their result types instead.
//! Sandbox plumbing has its own error type in the preview backend, folded
//! into the session's failure report rather than propagated.

use thiserror::Error;

/// Result type alias for fallible studio operations
pub type StudioResult<T> = Result<T, StudioError>;

/// Errors surfaced by the generation and preview plumbing
#[derive(Error, Debug)]
pub enum StudioError {
    /// Generation collaborator request failed (network, auth, bad payload)
    #[error("Provider '{provider}' request failed: {message}")]
    Provider { provider: String, message: String },

    /// Generation collaborator exceeded its per-call budget
    #[error("Provider '{provider}' timed out after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    /// Operation addressed a session that has been superseded or torn down
    #[error("Preview session {session_id} is no longer current")]
    SessionSuperseded { session_id: String },

    /// Configuration value or file is unusable
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl StudioError {
    /// Create a provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error is retryable (transient failure)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderTimeout { .. } => true,
            Self::Provider { message, .. } => {
                let lower = message.to_lowercase();
                lower.contains("timeout")
                    || lower.contains("connection")
                    || lower.contains("network")
                    || lower.contains("429")
                    || lower.contains("503")
            }
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
