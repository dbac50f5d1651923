use thiserror::Error;

use crate::registry::Phase;

/// Errors raised while declaring applications or driving a run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid question definition: {0}")]
    Construction(String),
    #[error("couldn't find workflow {name}")]
    UnresolvedWorkflow { name: String },
    #[error("cancelled by user")]
    Cancelled,
    #[error("workflow chain exceeded {limit} steps (last workflow: {last})")]
    ChainLimit { limit: usize, last: String },
    #[error("{phase} hook for '{target}' failed: {message}")]
    Hook {
        target: String,
        phase: Phase,
        message: String,
    },
    #[error("invalid prefill argument '{argument}', expected KEY=VALUE")]
    Prefill { argument: String },
    #[error("prompt failed: {0}")]
    Prompt(String),
    #[error("invalid answer file: {0}")]
    AnswerFile(#[source] serde_json::Error),
}

impl JobError {
    /// True when the run stopped because the user interrupted a prompt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }

    pub fn hook(target: &str, phase: Phase, message: impl Into<String>) -> Self {
        JobError::Hook {
            target: target.to_string(),
            phase,
            message: message.into(),
        }
    }
}
