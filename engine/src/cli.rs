//! CLI interface for Sahara
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::llm::ProviderKind;

/// Sahara task orchestrator
///
/// Breaks an analysis objective into sub-tasks, runs each against an LLM,
/// and assembles the results into a report.
#[derive(Parser, Debug)]
#[command(name = "sahara")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the orchestration loop for an objective
    Run {
        /// What the analysis should achieve
        objective: String,

        /// Reference content file, or `-` for stdin
        #[arg(short, long, value_name = "FILE")]
        reference: Option<PathBuf>,

        /// Let the orchestrator request web searches
        #[arg(long)]
        search: bool,

        /// Override the orchestrator call cap
        #[arg(long, value_name = "N")]
        max_iterations: Option<usize>,

        /// Write a zip bundle of the report and exchanges to the output directory
        #[arg(long)]
        archive: bool,

        /// Skip the refined report step
        #[arg(long)]
        no_report: bool,
    },

    /// Ask the expert persona for insights on a document
    Insights {
        /// Content file, or `-` for stdin
        file: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage provider API keys in the OS keychain
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Check configuration, credentials and provider health
    Doctor,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

/// Keychain actions
#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Store an API key (prompted without echo)
    Set {
        /// Provider name (openai, anthropic, gemini)
        provider: ProviderKind,
    },

    /// Remove a stored API key
    Delete {
        /// Provider name (openai, anthropic, gemini)
        provider: ProviderKind,
    },
}
