//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Orchestrate an objective and print (or bundle) the report
//! - insights: Expert commentary on a document
//! - config show / path: Inspect configuration
//! - key set / delete: Manage keychain entries
//! - doctor: Validate configuration and check providers

use anyhow::{bail, Context, Result};
use sdk::errors::{EngineError, SaharaErrorExt};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{Agent, ContinuationPolicy, Persona};
use crate::conductor::{RefinedReport, ReportAssembler, TaskManager, TaskOutcome, TaskRequest, TaskRun};
use crate::config::Config;
use crate::llm::client::LLMClient;
use crate::llm::ProviderKind;
use crate::search::{SearchProvider, SearxngProvider};
use crate::secrets::{Credentials, SecretManager, SecretString, SERVICE_NAME};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Options for `sahara run`
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub objective: String,
    pub reference: Option<PathBuf>,
    pub search: bool,
    pub max_iterations: Option<usize>,
    pub archive: bool,
    pub no_report: bool,
}

/// Shared pieces built from configuration
pub struct Components {
    pub client: Arc<LLMClient>,
    pub agent: Arc<Agent>,
    pub search: Option<Arc<dyn SearchProvider>>,
}

impl Components {
    pub fn build(config: &Config, credentials: &Credentials) -> Self {
        let client = Arc::new(LLMClient::from_config(&config.llm, credentials));
        let agent = Arc::new(Agent::new(
            Arc::clone(&client),
            config.llm.roles.clone(),
            ContinuationPolicy::from(&config.orchestration),
        ));

        let search: Option<Arc<dyn SearchProvider>> = if config.search.enabled {
            Some(Arc::new(SearxngProvider::new(
                config.search.base_url.clone(),
                config.search.max_results,
                Duration::from_secs(config.search.timeout_secs),
            )))
        } else {
            None
        };

        Self {
            client,
            agent,
            search,
        }
    }
}

fn resolve_credentials(config: &Config) -> Credentials {
    Credentials::resolve(&config.llm, &SecretManager::new(SERVICE_NAME))
}

/// Read reference content from a file, or stdin when the path is `-`
pub fn read_reference(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read reference content from stdin")?;
        return Ok(content);
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read reference file {}", path.display()))
}

/// Run the orchestration loop for an objective
pub async fn handle_run(options: RunOptions, config: &Config, format: OutputFormat) -> Result<()> {
    let reference = match &options.reference {
        Some(path) => Some(read_reference(path)?),
        None => None,
    };

    let max_iterations = options
        .max_iterations
        .unwrap_or(config.orchestration.max_iterations);
    if max_iterations == 0 {
        bail!("--max-iterations must be at least 1");
    }

    let components = Components::build(config, &resolve_credentials(config));
    let allow_search = options.search || config.orchestration.allow_search;

    let mut manager = TaskManager::new(Arc::clone(&components.agent), max_iterations);
    if allow_search {
        match components.search.clone() {
            Some(provider) => manager = manager.with_search(provider),
            None => tracing::info!("No search backend enabled; queries are passed through as-is"),
        }
    }

    let mut request = TaskRequest::new(options.objective.clone()).with_search(allow_search);
    if let Some(reference) = reference {
        request = request.with_reference(reference);
    }

    if let OutputFormat::Text = format {
        println!("Objective: {}", options.objective.trim());
        println!();
    }

    let run = manager.run(request).await?;

    let report = if options.no_report || run.exchanges().is_empty() {
        None
    } else {
        let assembler = ReportAssembler::new(Arc::clone(&components.agent));
        Some(assembler.refine(&run.objective, &run.formatted_results()).await)
    };

    // A failed bundle must not cost the caller the run itself
    let bundle = if options.archive {
        let written = write_bundle(&run, report.as_ref(), &config.core.output_dir);
        if let Err(e) = &written {
            tracing::warn!(run_id = %run.run_id, "Report bundle not written: {:#}", e);
        }
        Some(written)
    } else {
        None
    };

    match format {
        OutputFormat::Text => {
            for (i, exchange) in run.exchanges().iter().enumerate() {
                println!("── Sub-task {} ──", i + 1);
                println!("{}", exchange.formatted());
                println!();
            }

            match &run.outcome {
                TaskOutcome::Completed { summary } => {
                    println!("✓ Task complete: {}", summary);
                }
                TaskOutcome::MaxIterationsReached { limit } => {
                    println!(
                        "⚠ Stopped after {} orchestrator calls without completion",
                        limit
                    );
                }
                TaskOutcome::PlanningFailed { reason } => {
                    println!("⚠ Planning failed: {}", reason);
                }
            }

            if let Some(report) = &report {
                println!();
                println!("Report:");
                println!("{}", report.text);
            }

            println!();
            println!("  Sub-tasks:  {}", run.exchanges().len());
            println!("  Iterations: {}/{}", run.iterations, manager.max_iterations());
            println!("  Duration:   {}ms", run.duration_ms);
            match &bundle {
                Some(Ok(path)) => println!("  Bundle:     {}", path.display()),
                Some(Err(e)) => println!("  Bundle:     not written ({:#})", e),
                None => {}
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "run": run,
                "report": report,
                "max_iterations": manager.max_iterations(),
                "bundle": bundle.as_ref().and_then(|b| b.as_ref().ok()),
                "bundle_error": bundle.as_ref().and_then(|b| b.as_ref().err()).map(|e| format!("{:#}", e)),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn write_bundle(run: &TaskRun, report: Option<&RefinedReport>, dir: &Path) -> Result<PathBuf> {
    let archive = ReportAssembler::bundle(run, report, &chrono::Local::now())
        .context("Failed to build report bundle")?;
    archive
        .write_to(dir)
        .context("Failed to write report bundle")
}

/// Expert commentary on a document
pub async fn handle_insights(file: PathBuf, config: &Config, format: OutputFormat) -> Result<()> {
    let content = read_reference(&file)?;
    if content.trim().is_empty() {
        bail!("Nothing to analyze: {} is empty", file.display());
    }

    let components = Components::build(config, &resolve_credentials(config));
    let response = components.agent.expert_review(&content).await;

    match format {
        OutputFormat::Text => {
            println!("{}", response.text);
        }
        OutputFormat::Json => {
            let output = json!({
                "persona": Persona::Expert,
                "model": components.agent.roles().model_for(Persona::Expert),
                "insights": response.text,
                "continuations": response.continuations,
                "degraded": response.is_degraded(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{}", text);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }
    Ok(())
}

/// Print the configuration file path in use
pub fn handle_config_path(override_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };

    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => println!("{}", json!({ "path": path })),
    }
    Ok(())
}

/// Store a provider API key in the keychain
pub fn handle_key_set(provider: ProviderKind) -> Result<()> {
    if !provider.requires_api_key() {
        bail!("{} does not use an API key", provider);
    }

    let key = rpassword::prompt_password_stdout(&format!("{} API key: ", provider))
        .context("Failed to read API key")?;
    let key = SecretString::new(key.trim());

    SecretManager::new(SERVICE_NAME).set_secret(&provider.secret_key(), &key)?;
    println!("✓ Stored {} API key in the system keychain", provider);
    Ok(())
}

/// Remove a provider API key from the keychain
pub fn handle_key_delete(provider: ProviderKind) -> Result<()> {
    let manager = SecretManager::new(SERVICE_NAME);
    if !manager.has_secret(&provider.secret_key()) {
        bail!("No {} API key is stored in the system keychain", provider);
    }
    manager.delete_secret(&provider.secret_key())?;
    println!("✓ Removed {} API key from the system keychain", provider);
    Ok(())
}

/// Validate configuration, credentials and provider health
pub async fn handle_doctor(
    config: &Config,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Check 1: Configuration (already validated when loaded)
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };
    checks.push(("Configuration".to_string(), format!("Valid ({})", path.display())));

    // Check 2: Output directory
    if config.core.output_dir.exists() {
        checks.push(("Output directory".to_string(), "Exists".to_string()));
    } else {
        checks.push((
            "Output directory".to_string(),
            "Missing (created on first --archive)".to_string(),
        ));
    }

    // Check 3: Credentials for providers the config actually uses
    let credentials = resolve_credentials(config);
    for kind in ProviderKind::ALL {
        if !kind.requires_api_key() {
            continue;
        }
        let status = match credentials.source(kind) {
            Some(source) => format!("Configured ({})", source),
            None => "Not configured".to_string(),
        };
        if credentials.source(kind).is_none() && config.llm.referenced_providers().contains(&kind) {
            issues.push(format!(
                "{} is used by a persona or fallback but has no API key. Run 'sahara key set {}'.",
                kind, kind
            ));
        }
        checks.push((format!("{} API key", kind), status));
    }

    // Check 4: Persona models
    for persona in Persona::ALL {
        checks.push((
            format!("{} model", persona),
            config.llm.roles.model_for(persona).to_string(),
        ));
    }

    // Check 5: Provider health
    let components = Components::build(config, &credentials);
    for health in components.client.check_health().await {
        let location = if health.local { "local" } else { "cloud" };
        let status = if health.healthy { "OK" } else { "Unavailable" };
        checks.push((
            format!("{} health", health.name),
            format!("{} ({})", status, location),
        ));
        if !health.healthy
            && health.name == ProviderKind::Ollama.as_str()
            && config.llm.referenced_providers().contains(&ProviderKind::Ollama)
        {
            issues.push("Ollama is not running. Start Ollama to use local models.".to_string());
        }
    }

    // Check 6: Search backend
    match &components.search {
        Some(provider) => match provider.search("balance sheet").await {
            Ok(hits) => checks.push((
                "Search backend".to_string(),
                format!("{} OK ({} hits)", config.search.base_url, hits.len()),
            )),
            Err(e) => {
                let err = EngineError::from(e);
                checks.push(("Search backend".to_string(), "Unavailable".to_string()));
                issues.push(format!("{}. {}", err, err.user_hint()));
            }
        },
        None => checks.push(("Search backend".to_string(), "Disabled".to_string())),
    }

    match format {
        OutputFormat::Text => {
            println!("Sahara Diagnostics");
            println!("==================");
            println!();

            for (check, status) in &checks {
                println!("  {:<28} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
