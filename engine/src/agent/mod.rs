//! Agent
//!
//! Persona-scoped access to the LLM client. The orchestrator plans, the
//! executor runs sub-tasks and the expert reviews. See [`core::Agent`].

pub mod core;
pub mod extract;
pub mod persona;

pub use core::{Agent, ContinuationPolicy, Plan, Response, COMPLETION_SENTINEL, DEGRADED_RESPONSE};
pub use extract::extract_search_query;
pub use persona::{Persona, RoleModels};
