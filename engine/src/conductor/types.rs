use serde::Serialize;

/// One executed sub-task: the prompt sent to the executor and what came back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubTaskExchange {
    pub prompt: String,
    pub result: String,
}

impl SubTaskExchange {
    /// Report line for this exchange
    pub fn formatted(&self) -> String {
        format!(
            "Orchestrator Prompt: {}\nSub-agent Result: {}",
            self.prompt, self.result
        )
    }
}

/// Input to a task run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    /// Analysis goal
    pub objective: String,

    /// Text made available to the orchestrator and the first sub-task only
    pub reference: Option<String>,

    /// Let the orchestrator request searches
    pub allow_search: bool,
}

impl TaskRequest {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            reference: None,
            allow_search: false,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_search(mut self, allow_search: bool) -> Self {
        self.allow_search = allow_search;
        self
    }
}

/// How a task run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The orchestrator emitted the completion sentinel
    Completed { summary: String },

    /// The plan-call cap was hit before completion
    MaxIterationsReached { limit: usize },

    /// The orchestrator call itself failed
    PlanningFailed { reason: String },
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }
}

/// Record of one task run
#[derive(Debug, Clone, Serialize)]
pub struct TaskRun {
    pub run_id: String,
    pub objective: String,
    exchanges: Vec<SubTaskExchange>,
    pub outcome: TaskOutcome,
    /// Orchestrator calls made
    pub iterations: usize,
    pub duration_ms: u64,
}

impl TaskRun {
    pub(crate) fn new(
        run_id: String,
        objective: String,
        exchanges: Vec<SubTaskExchange>,
        outcome: TaskOutcome,
        iterations: usize,
        duration_ms: u64,
    ) -> Self {
        Self {
            run_id,
            objective,
            exchanges,
            outcome,
            iterations,
            duration_ms,
        }
    }

    /// Exchanges in execution order
    pub fn exchanges(&self) -> &[SubTaskExchange] {
        &self.exchanges
    }

    /// Final text from the orchestrator, when the run completed
    pub fn summary(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Completed { summary } => Some(summary),
            _ => None,
        }
    }

    /// One `Orchestrator Prompt / Sub-agent Result` block per exchange
    pub fn formatted_results(&self) -> Vec<String> {
        self.exchanges.iter().map(SubTaskExchange::formatted).collect()
    }
}
