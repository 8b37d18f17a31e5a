//! Sahara Engine Library
//!
//! This library provides the core functionality of the Sahara task orchestrator.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Persona-scoped agent operations
pub mod agent;

/// Search backends for orchestrator queries
pub mod search;

/// Orchestration loop and report assembly
pub mod conductor;

/// In-memory zip packaging
pub mod packager;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
