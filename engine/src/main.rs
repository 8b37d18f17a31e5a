// Sahara task orchestrator
// Main entry point for the sahara binary

use clap::Parser;
use sahara_engine::cli::{Cli, Command, ConfigAction, KeyAction};
use sahara_engine::config::Config;
use sahara_engine::handlers::{
    handle_config_path, handle_config_show, handle_doctor, handle_insights, handle_key_delete,
    handle_key_set, handle_run, OutputFormat, RunOptions,
};
use sahara_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Commands that must work even with a broken config file
    if let Command::Config {
        action: ConfigAction::Path,
    } = &cli.command
    {
        return handle_config_path(cli.config.as_deref(), format);
    }

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log beats config; RUST_LOG beats both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::debug!(
        "Sahara v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    // Handle commands
    match cli.command {
        Command::Run {
            objective,
            reference,
            search,
            max_iterations,
            archive,
            no_report,
        } => {
            let options = RunOptions {
                objective,
                reference,
                search,
                max_iterations,
                archive,
                no_report,
            };
            handle_run(options, &config, format).await
        }

        Command::Insights { file } => handle_insights(file, &config, format).await,

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(cli.config.as_deref(), format),
        },

        Command::Key { action } => match action {
            KeyAction::Set { provider } => handle_key_set(provider),
            KeyAction::Delete { provider } => handle_key_delete(provider),
        },

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, cli.config.as_deref(), format).await
        }
    }
}
