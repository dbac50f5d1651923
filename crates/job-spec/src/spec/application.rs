use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::Phase;
use crate::spec::question::Question;

/// A named question list that can be selected or chained into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Static hook: merges `set` into the answers when the target stage runs.
///
/// An empty `workflow` targets the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HookSpec {
    #[serde(default)]
    pub workflow: String,
    pub phase: Phase,
    #[serde(default)]
    pub set: Map<String, Value>,
}

/// Declarative application definition, as stored in an application directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApplicationSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub mainflow: Vec<Question>,
    /// Selectable workflows, offered after the main flow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workflows: Vec<WorkflowSpec>,
    /// Chain-only flows, reachable through `nextworkflow`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<WorkflowSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookSpec>,
}

impl ApplicationSpec {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}
