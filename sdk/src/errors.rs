//! Error types and handling
//!
//! This module provides the error types surfaced to callers of the Sahara
//! engine. All errors implement the `SaharaErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! Only failures the caller must act on live here: configuration problems,
//! missing input, packaging errors and credential storage failures. Backend
//! and extraction failures inside a task run are absorbed by the engine and
//! never reach this type.
//!
//! # Security
//!
//! Error messages must not carry API keys. Provider error bodies are scrubbed
//! by the engine before they are wrapped in `LLMProvider`.

use thiserror::Error;

/// Trait for Sahara error extensions
///
/// Provides additional context for errors, including user-friendly hints
/// and recoverability information.
pub trait SaharaErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is a static string and never echoes the error payload.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be fixed by correcting the input and retrying.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, SaharaErrorExt};
///
/// let error = EngineError::InvalidInput("objective must not be empty".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let error = EngineError::Config("unknown provider 'foo'".to_string());
/// assert!(!error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Caller input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Project packaging errors
    #[error("Packaging error: {0}")]
    Packaging(String),

    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Search errors
    #[error("Search error: {0}")]
    Search(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SaharaErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::InvalidInput(_) => "Check the objective and reference content you supplied",
            Self::Packaging(_) => "Archive paths must be relative and must not contain '..'",
            Self::DuplicateEntry(_) => "Two files were given the same path in the archive",
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",
            Self::Search(_) => "Search backend unavailable. Check the [search] section",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::KeyringError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::DuplicateEntry("report/report.md".to_string());
        assert_eq!(
            err.to_string(),
            "Duplicate archive entry: report/report.md"
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(EngineError::InvalidInput("x".into()).is_recoverable());
        assert!(EngineError::Packaging("x".into()).is_recoverable());
        assert!(EngineError::LLMProvider("x".into()).is_recoverable());
        assert!(!EngineError::Config("x".into()).is_recoverable());
        assert!(!EngineError::KeyringError("x".into()).is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
        assert_eq!(err.user_hint(), "File system operation failed");
    }
}
