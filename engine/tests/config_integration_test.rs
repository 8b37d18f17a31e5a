//! Integration tests for loading configuration files from disk

use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use sahara_engine::agent::{ContinuationPolicy, Persona};
use sahara_engine::config::Config;
use sahara_engine::llm::ProviderKind;
use sdk::errors::EngineError;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
[core]
log_level = "debug"
output_dir = "/tmp/sahara-reports"

[llm]
timeout_secs = 30
temperature = 0.2
max_output_tokens = 2048
fallback = ["ollama/llama3.1:8b"]

[llm.roles]
orchestrator = "anthropic/claude-3-5-sonnet-latest"
expert = "openai/gpt-4o"
executor = "ollama/qwen2.5:14b"

[llm.ollama]
base_url = "http://gpu-box:11434"

[llm.openai]
base_url = "https://proxy.internal/v1"
api_key_env = "CORP_OPENAI_KEY"

[orchestration]
max_iterations = 6
truncation_threshold = 3000
max_continuations = 2
allow_search = true

[search]
enabled = true
base_url = "http://searx:8080"
max_results = 3
"#,
    );

    let config = Config::load_from_path(file.path()).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.core.output_dir, PathBuf::from("/tmp/sahara-reports"));

    assert_eq!(config.llm.timeout().as_secs(), 30);
    assert_eq!(config.llm.generation_params().max_output_tokens, 2048);
    assert_eq!(
        config.llm.roles.model_for(Persona::Orchestrator).to_string(),
        "anthropic/claude-3-5-sonnet-latest"
    );
    assert_eq!(
        config.llm.roles.model_for(Persona::Executor).model,
        "qwen2.5:14b"
    );
    assert_eq!(
        config.llm.referenced_providers(),
        vec![ProviderKind::Anthropic, ProviderKind::OpenAI, ProviderKind::Ollama]
    );

    assert_eq!(config.llm.provider(ProviderKind::Ollama).base_url, "http://gpu-box:11434");
    assert_eq!(
        config.llm.provider(ProviderKind::OpenAI).api_key_env.as_deref(),
        Some("CORP_OPENAI_KEY")
    );
    // Untouched sections keep their defaults
    assert_eq!(
        config.llm.provider(ProviderKind::Gemini).api_key_env.as_deref(),
        Some("GEMINI_API_KEY")
    );

    let policy = ContinuationPolicy::from(&config.orchestration);
    assert_eq!(policy.truncation_threshold, 3000);
    assert_eq!(policy.max_continuations, 2);
    assert_eq!(config.orchestration.max_iterations, 6);
    assert!(config.orchestration.allow_search);

    assert!(config.search.enabled);
    assert_eq!(config.search.max_results, 3);
    assert_eq!(config.search.timeout_secs, 15);
}

#[test]
fn test_load_empty_file_uses_defaults() {
    let file = write_config("");
    let config = Config::load_from_path(file.path()).unwrap();

    assert_eq!(config.orchestration.max_iterations, 10);
    assert_eq!(config.orchestration.truncation_threshold, 4000);
    assert_eq!(config.orchestration.max_continuations, 3);
    assert!(!config.search.enabled);
    assert!(!config.core.output_dir.starts_with("~"));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn test_load_rejects_unknown_persona() {
    let file = write_config(
        r#"
[llm.roles]
orchestrator = "ollama/a"
expert = "ollama/b"
executor = "ollama/c"
auditor = "ollama/d"
"#,
    );
    assert!(Config::load_from_path(file.path()).is_err());
}

#[test]
fn test_load_rejects_bad_model_reference() {
    let file = write_config(
        r#"
[llm]
fallback = ["not-a-model-ref"]
"#,
    );
    let err = Config::load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn test_load_rejects_zero_iterations() {
    let file = write_config("[orchestration]\nmax_iterations = 0\n");
    let err = Config::load_from_path(file.path()).unwrap_err();
    assert!(err.to_string().contains("max_iterations"));
}
