//! Personas and the models that back them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::llm::{ModelRef, ProviderKind};

/// The three roles an agent call can take.
///
/// Each persona carries a fixed system instruction. Configuration keys
/// deserialize straight into this enum, so an unknown role fails at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Plans the next sub-task or declares completion
    Orchestrator,

    /// Reviews content and refines the final report
    Expert,

    /// Carries out one concrete sub-task
    Executor,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Orchestrator, Persona::Expert, Persona::Executor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Orchestrator => "orchestrator",
            Persona::Expert => "expert",
            Persona::Executor => "executor",
        }
    }

    /// System message sent ahead of every prompt for this persona
    pub fn system_instruction(&self) -> &'static str {
        match self {
            Persona::Orchestrator => {
                "You are a financial task orchestrator. Your goal is to break down complex \
                 financial analysis objectives into manageable sub-tasks and craft detailed \
                 prompts for specialized agents to execute those tasks. Incorporate insights \
                 from the expert and validate the executor's outputs."
            }
            Persona::Expert => {
                "You are a seasoned financial analyst specializing in balance sheet analysis. \
                 Your role is to provide in-depth insights and interpretations of financial \
                 data, identifying key trends, risks, and opportunities."
            }
            Persona::Executor => {
                "You are a meticulous financial task executor. Your primary goal is to \
                 accurately perform calculations and provide specific answers based on the \
                 given financial data and the instructions provided in the prompt."
            }
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Persona::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                format!(
                    "unknown persona '{}' (expected orchestrator, expert or executor)",
                    s
                )
            })
    }
}

fn default_model() -> ModelRef {
    ModelRef::new(ProviderKind::Gemini, "gemini-1.5-flash-latest")
}

/// Model used by each persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleModels {
    #[serde(default = "default_model")]
    pub orchestrator: ModelRef,

    #[serde(default = "default_model")]
    pub expert: ModelRef,

    #[serde(default = "default_model")]
    pub executor: ModelRef,
}

impl Default for RoleModels {
    fn default() -> Self {
        Self::uniform(default_model())
    }
}

impl RoleModels {
    /// Same model for every persona
    pub fn uniform(model: ModelRef) -> Self {
        Self {
            orchestrator: model.clone(),
            expert: model.clone(),
            executor: model,
        }
    }

    pub fn model_for(&self, persona: Persona) -> &ModelRef {
        match persona {
            Persona::Orchestrator => &self.orchestrator,
            Persona::Expert => &self.expert,
            Persona::Executor => &self.executor,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelRef> {
        Persona::ALL.into_iter().map(move |p| self.model_for(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_persona_has_distinct_instruction() {
        let instructions: Vec<&str> = Persona::ALL.iter().map(|p| p.system_instruction()).collect();
        assert!(instructions.iter().all(|i| !i.is_empty()));
        assert_ne!(instructions[0], instructions[1]);
        assert_ne!(instructions[1], instructions[2]);
    }

    #[test]
    fn test_persona_parsing() {
        assert_eq!("Expert".parse::<Persona>().unwrap(), Persona::Expert);
        assert!("analyst".parse::<Persona>().is_err());
    }

    #[test]
    fn test_role_models_reject_unknown_role() {
        let result: Result<RoleModels, _> = toml::from_str("analyst = \"gemini/x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_role_models_partial_override() {
        let roles: RoleModels = toml::from_str("executor = \"ollama/llama3.1:8b\"\n").unwrap();
        assert_eq!(roles.executor.provider, ProviderKind::Ollama);
        assert_eq!(roles.orchestrator, default_model());
        assert_eq!(roles.iter().count(), 3);
    }
}
