//! Conductor
//!
//! Runs the plan/execute loop for an objective and assembles the final report.

pub mod report;
pub mod task_manager;
pub mod types;

pub use report::{bundle_name, RefinedReport, ReportAssembler};
pub use task_manager::{completion_summary, TaskManager};
pub use types::{SubTaskExchange, TaskOutcome, TaskRequest, TaskRun};
