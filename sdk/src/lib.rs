//! Sahara SDK
//!
//! Shared library providing the error type used by the engine and its CLI.

/// Error types and handling
pub mod errors;

// Re-export commonly used types
pub use errors::{EngineError, SaharaErrorExt};
