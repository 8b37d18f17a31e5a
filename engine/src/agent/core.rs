//! Agent Core
//!
//! Wraps the LLM client with the three personas and exposes the role-specific
//! operations the task manager and report assembler need:
//!
//! 1. `plan` asks the orchestrator for the next sub-task (or completion)
//! 2. `execute` runs one sub-task with the executor persona
//! 3. `expert_review` and `consult` ask the expert for commentary
//!
//! Backend failures never escape this module. A failed call produces the
//! degraded placeholder text so the caller's loop can keep going.
//!
//! # Continuation
//!
//! A completion whose length reaches the truncation threshold is assumed to
//! have been cut off. The conversation is sent back with a "continue" turn and
//! the chunks are concatenated, up to `max_continuations` follow-ups.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::OrchestrationConfig;
use crate::llm::client::LLMClient;
use crate::llm::Message;
use crate::search::SearchContext;

use super::extract::extract_search_query;
use super::{Persona, RoleModels};

/// Text returned in place of a completion when the backend call fails
pub const DEGRADED_RESPONSE: &str = "An error occurred while generating a response.";

/// Marker the orchestrator uses to declare the objective done
pub const COMPLETION_SENTINEL: &str = "The task is complete:";

const CONTINUE_PROMPT: &str =
    "Continue exactly where you left off. Do not repeat any text you have already written.";

/// Bounds for the continuation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuationPolicy {
    /// A chunk at least this many characters long is treated as truncated
    pub truncation_threshold: usize,

    /// Maximum follow-up calls per completion
    pub max_continuations: usize,
}

impl Default for ContinuationPolicy {
    fn default() -> Self {
        Self {
            truncation_threshold: 4000,
            max_continuations: 3,
        }
    }
}

impl From<&OrchestrationConfig> for ContinuationPolicy {
    fn from(config: &OrchestrationConfig) -> Self {
        Self {
            truncation_threshold: config.truncation_threshold,
            max_continuations: config.max_continuations,
        }
    }
}

/// Result of one orchestrator call
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Raw orchestrator text
    pub text: String,

    /// Query pulled from an embedded JSON fragment, if searching was allowed
    pub search_query: Option<String>,

    /// Backend error when the call failed
    pub failure: Option<String>,
}

impl Plan {
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// Result of an executor or expert call
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Generated text, or the degraded placeholder
    pub text: String,

    /// Follow-up calls issued under the continuation rule
    pub continuations: usize,

    /// Backend error when the first call failed
    pub failure: Option<String>,
}

impl Response {
    fn degraded(error: String) -> Self {
        Self {
            text: DEGRADED_RESPONSE.to_string(),
            continuations: 0,
            failure: Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// Persona-aware front end to the LLM client
pub struct Agent {
    client: Arc<LLMClient>,
    roles: RoleModels,
    policy: ContinuationPolicy,
}

impl Agent {
    pub fn new(client: Arc<LLMClient>, roles: RoleModels, policy: ContinuationPolicy) -> Self {
        Self {
            client,
            roles,
            policy,
        }
    }

    pub fn roles(&self) -> &RoleModels {
        &self.roles
    }

    pub fn policy(&self) -> ContinuationPolicy {
        self.policy
    }

    /// Ask the orchestrator for the next sub-task prompt or a completion.
    ///
    /// `reference` is included only when supplied; the caller drops it after
    /// the first sub-task has run.
    pub async fn plan(
        &self,
        objective: &str,
        reference: Option<&str>,
        previous_results: &[&str],
        allow_search: bool,
    ) -> Plan {
        let prompt = build_plan_prompt(objective, reference, previous_results, allow_search);
        let model = self.roles.model_for(Persona::Orchestrator);
        let messages = persona_messages(Persona::Orchestrator, prompt);

        match self.client.complete(model, &messages).await {
            Ok(text) => {
                let search_query = if allow_search {
                    extract_search_query(&text)
                } else {
                    None
                };
                debug!(
                    "Orchestrator replied with {} chars (search query: {})",
                    text.chars().count(),
                    search_query.is_some()
                );
                Plan {
                    text,
                    search_query,
                    failure: None,
                }
            }
            Err(e) => {
                warn!("Orchestrator call failed: {}", e);
                Plan {
                    text: DEGRADED_RESPONSE.to_string(),
                    search_query: None,
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    /// Run one sub-task with the executor persona.
    ///
    /// Search context goes after the prompt, then the reference content.
    pub async fn execute(
        &self,
        prompt: &str,
        reference: Option<&str>,
        search: Option<&SearchContext>,
    ) -> Response {
        let mut full_prompt = prompt.to_string();
        if let Some(search) = search {
            full_prompt.push_str("\n\n");
            full_prompt.push_str(&search.render());
        }
        if let Some(reference) = reference {
            full_prompt.push_str("\n\nUse the provided reference content:\n");
            full_prompt.push_str(reference);
        }

        self.consult(Persona::Executor, full_prompt).await
    }

    /// Expert commentary on raw content
    pub async fn expert_review(&self, content: &str) -> Response {
        let prompt = format!(
            "Analyze the following content and provide your expert insights:\n{}",
            content
        );
        self.consult(Persona::Expert, prompt).await
    }

    /// Send a prompt to a persona under the continuation rule
    pub async fn consult(&self, persona: Persona, prompt: String) -> Response {
        let model = self.roles.model_for(persona);
        let mut messages = persona_messages(persona, prompt);

        let mut chunk = match self.client.complete(model, &messages).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{} call failed, returning degraded response: {}", persona, e);
                return Response::degraded(e.to_string());
            }
        };

        let mut text = String::new();
        let mut continuations = 0;

        loop {
            let chunk_len = chunk.chars().count();
            text.push_str(&chunk);

            if chunk_len < self.policy.truncation_threshold {
                break;
            }
            if continuations >= self.policy.max_continuations {
                debug!(
                    "{} output still at threshold after {} continuations",
                    persona, continuations
                );
                break;
            }

            messages.push(Message::assistant(std::mem::take(&mut chunk)));
            messages.push(Message::user(CONTINUE_PROMPT));
            continuations += 1;
            debug!("{} output reached {} chars, continuing ({})", persona, chunk_len, continuations);

            match self.client.complete(model, &messages).await {
                Ok(next) => chunk = next,
                Err(e) => {
                    warn!("{} continuation failed, keeping partial text: {}", persona, e);
                    break;
                }
            }
        }

        Response {
            text,
            continuations,
            failure: None,
        }
    }
}

fn persona_messages(persona: Persona, prompt: String) -> Vec<Message> {
    vec![
        Message::system(persona.system_instruction()),
        Message::user(prompt),
    ]
}

fn build_plan_prompt(
    objective: &str,
    reference: Option<&str>,
    previous_results: &[&str],
    allow_search: bool,
) -> String {
    let previous = if previous_results.is_empty() {
        "None".to_string()
    } else {
        previous_results.join("\n")
    };

    let mut prompt = format!("Objective: {}\n", objective);
    if let Some(reference) = reference {
        prompt.push_str(&format!("Reference Content:\n{}\n", reference));
    }
    prompt.push_str(&format!("\nPrevious Sub-task Results:\n{}\n\n", previous));
    prompt.push_str(&format!(
        "Based on the objective and any reference content, determine the next sub-task \
         and create a concise and detailed prompt for the executor. Incorporate any \
         relevant insights from previous results. If the objective has been fully \
         addressed, reply with \"{}\" followed by the final answer instead.",
        COMPLETION_SENTINEL
    ));

    if allow_search {
        prompt.push_str(
            " If additional information is required, also include a JSON object of the \
             form {\"search_query\": \"<query>\"}.",
        );
    }

    prompt
}
