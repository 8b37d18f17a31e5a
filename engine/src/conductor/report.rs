//! Report Assembler
//!
//! Turns the results of a task run into a single refined document with the
//! expert persona, and lays out the downloadable report bundle.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, TimeZone};
use regex::Regex;
use sdk::errors::EngineError;
use serde::Serialize;

use crate::agent::{Agent, Persona};
use crate::packager::{ProjectArchive, ProjectPackager};

use super::types::{TaskOutcome, TaskRun};

/// Final document produced from a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinedReport {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RefinedReport {
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

pub struct ReportAssembler {
    agent: Arc<Agent>,
}

impl ReportAssembler {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    /// Ask the expert to merge all sub-task results into one document.
    ///
    /// A backend failure yields the degraded placeholder text.
    pub async fn refine(&self, objective: &str, results: &[String]) -> RefinedReport {
        let response = self
            .agent
            .consult(Persona::Expert, build_refine_prompt(objective, results))
            .await;

        if response.is_degraded() {
            tracing::warn!("Report refinement degraded");
        }

        RefinedReport {
            text: response.text,
            failure: response.failure,
        }
    }

    /// Package a run as `report/report.md` plus one `exchanges/NN.md` per exchange.
    pub fn bundle<Tz: TimeZone>(
        run: &TaskRun,
        report: Option<&RefinedReport>,
        at: &DateTime<Tz>,
    ) -> Result<ProjectArchive, EngineError>
    where
        Tz::Offset: std::fmt::Display,
    {
        let mut files: Vec<(String, String)> = vec![(
            "report/report.md".to_string(),
            render_report(run, report),
        )];

        for (i, exchange) in run.exchanges().iter().enumerate() {
            files.push((
                format!("exchanges/{:02}.md", i + 1),
                format!(
                    "## Orchestrator Prompt\n\n{}\n\n## Sub-agent Result\n\n{}\n",
                    exchange.prompt, exchange.result
                ),
            ));
        }

        ProjectPackager::new().build(
            &bundle_name(&run.objective, at),
            &["report", "exchanges"],
            &files,
        )
    }
}

fn build_refine_prompt(objective: &str, results: &[String]) -> String {
    let results = if results.is_empty() {
        "None".to_string()
    } else {
        results.join("\n\n")
    };

    format!(
        "Objective: {}\n\nSub-task Results:\n{}\n\n\
         Using the sub-task results above, write a single coherent final report that \
         addresses the objective. Resolve any inconsistencies between results and keep \
         every computed figure exactly as given.",
        objective, results
    )
}

fn render_report(run: &TaskRun, report: Option<&RefinedReport>) -> String {
    let mut out = format!("# {}\n\nRun: {}\n", run.objective, run.run_id);

    let outcome = match &run.outcome {
        TaskOutcome::Completed { .. } => "completed".to_string(),
        TaskOutcome::MaxIterationsReached { limit } => {
            format!("stopped after {} orchestrator calls", limit)
        }
        TaskOutcome::PlanningFailed { reason } => format!("planning failed ({})", reason),
    };
    out.push_str(&format!(
        "Outcome: {}\nSub-tasks: {}\n",
        outcome,
        run.exchanges().len()
    ));

    if let Some(summary) = run.summary() {
        out.push_str(&format!("\n## Summary\n\n{}\n", summary));
    }
    if let Some(report) = report {
        out.push_str(&format!("\n## Report\n\n{}\n", report.text));
    }

    out
}

static NON_WORD: OnceLock<Option<Regex>> = OnceLock::new();

/// Longest objective stem kept in a bundle name, in bytes
const MAX_STEM_BYTES: usize = 100;

/// `<objective with non-word runs replaced by _>_<%Y-%m-%d_%H-%M-%S>`
pub fn bundle_name<Tz: TimeZone>(objective: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let sanitized = match NON_WORD
        .get_or_init(|| Regex::new(r"\W+").ok())
        .as_ref()
    {
        Some(re) => re.replace_all(objective, "_").into_owned(),
        None => objective.to_string(),
    };

    let mut end = sanitized.len().min(MAX_STEM_BYTES);
    while !sanitized.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}_{}", &sanitized[..end], at.format("%Y-%m-%d_%H-%M-%S"))
}
