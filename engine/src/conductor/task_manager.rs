//! Task Manager
//!
//! Drives the orchestration loop for one objective:
//!
//! 1. Ask the orchestrator for the next step (objective, unconsumed reference,
//!    every prior result)
//! 2. If the reply contains the completion sentinel, stop
//! 3. Otherwise run the reply as a sub-task prompt. The first one also
//!    carries the reference content, which is then dropped for good
//! 4. Record the exchange and go back to 1
//!
//! The loop makes at most `max_iterations` orchestrator calls. Backend
//! failures never surface as errors; they show up in the outcome or as
//! degraded exchange results.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sdk::errors::EngineError;

use crate::agent::{Agent, COMPLETION_SENTINEL};
use crate::search::{SearchContext, SearchProvider};

use super::types::{SubTaskExchange, TaskOutcome, TaskRequest, TaskRun};

/// Runs orchestration loops against a shared agent
pub struct TaskManager {
    agent: Arc<Agent>,
    search: Option<Arc<dyn SearchProvider>>,
    max_iterations: usize,
}

impl TaskManager {
    pub fn new(agent: Arc<Agent>, max_iterations: usize) -> Self {
        Self {
            agent,
            search: None,
            max_iterations,
        }
    }

    /// Resolve orchestrator search queries against a backend
    pub fn with_search(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(provider);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run the loop to completion, the iteration cap, or a planning failure.
    ///
    /// # Errors
    /// `EngineError::InvalidInput` when the objective is blank. Nothing else.
    pub async fn run(&self, request: TaskRequest) -> Result<TaskRun, EngineError> {
        let objective = request.objective.trim().to_string();
        if objective.is_empty() {
            return Err(EngineError::InvalidInput(
                "Objective must not be empty".to_string(),
            ));
        }

        let run_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        info!(
            run_id = %run_id,
            has_reference = request.reference.is_some(),
            allow_search = request.allow_search,
            "Starting task run"
        );

        let mut reference = request.reference.filter(|r| !r.is_empty());
        let mut exchanges: Vec<SubTaskExchange> = Vec::new();
        let mut iterations = 0;

        let outcome = loop {
            if iterations >= self.max_iterations {
                warn!(
                    run_id = %run_id,
                    "Reached {} orchestrator calls without completion",
                    self.max_iterations
                );
                break TaskOutcome::MaxIterationsReached {
                    limit: self.max_iterations,
                };
            }
            iterations += 1;
            debug!(run_id = %run_id, iteration = iterations, "Awaiting plan");

            let previous: Vec<&str> = exchanges.iter().map(|e| e.result.as_str()).collect();
            let plan = self
                .agent
                .plan(
                    &objective,
                    reference.as_deref(),
                    &previous,
                    request.allow_search,
                )
                .await;

            if let Some(reason) = plan.failure {
                warn!(run_id = %run_id, "Planning failed: {}", reason);
                break TaskOutcome::PlanningFailed { reason };
            }

            if let Some(summary) = completion_summary(&plan.text) {
                break TaskOutcome::Completed { summary };
            }

            let search = match plan.search_query {
                Some(query) => Some(self.resolve_search(query).await),
                None => None,
            };

            let mut prompt = plan.text;
            if let Some(content) = reference.take() {
                prompt = format!("{}\n\nFile content:\n{}", prompt, content);
            }

            debug!(run_id = %run_id, iteration = iterations, "Executing sub-task");
            let response = self.agent.execute(&prompt, None, search.as_ref()).await;
            if response.is_degraded() {
                warn!(run_id = %run_id, "Sub-task {} returned a degraded result", exchanges.len() + 1);
            }

            exchanges.push(SubTaskExchange {
                prompt,
                result: response.text,
            });
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            exchanges = exchanges.len(),
            iterations,
            duration_ms,
            completed = outcome.is_completed(),
            "Task run finished"
        );

        Ok(TaskRun::new(
            run_id,
            objective,
            exchanges,
            outcome,
            iterations,
            duration_ms,
        ))
    }

    async fn resolve_search(&self, query: String) -> SearchContext {
        let Some(provider) = &self.search else {
            return SearchContext::Query(query);
        };

        match provider.search(&query).await {
            Ok(hits) => {
                debug!("{} returned {} hits", provider.name(), hits.len());
                SearchContext::Results { query, hits }
            }
            Err(e) => {
                warn!("Search via {} failed, passing query through: {}", provider.name(), e);
                SearchContext::Query(query)
            }
        }
    }
}

/// Text following the completion sentinel, if the sentinel is present
pub fn completion_summary(text: &str) -> Option<String> {
    text.find(COMPLETION_SENTINEL)
        .map(|pos| text[pos + COMPLETION_SENTINEL.len()..].trim().to_string())
}
