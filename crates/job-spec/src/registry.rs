//! Per-run registration context: the selectable workflows, chain-only flows
//! and pre/post hooks an application declares.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::answers::{Answers, merge};
use crate::error::JobError;
use crate::spec::question::Question;

/// Hook target name for hooks that wrap the whole run.
pub const GLOBAL_HOOK: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pre => write!(f, "pre"),
            Phase::Post => write!(f, "post"),
        }
    }
}

/// Produces the questions of a workflow from the answers collected so far.
pub trait QuestionSource {
    fn questions(&self, answers: &Answers) -> Result<Vec<Question>, JobError>;
}

impl<F> QuestionSource for F
where
    F: Fn(&Answers) -> Result<Vec<Question>, JobError>,
{
    fn questions(&self, answers: &Answers) -> Result<Vec<Question>, JobError> {
        self(answers)
    }
}

impl QuestionSource for Vec<Question> {
    fn questions(&self, _answers: &Answers) -> Result<Vec<Question>, JobError> {
        Ok(self.clone())
    }
}

/// Runs before or after a stage; returned answers are merged into the run.
pub trait Hook {
    fn call(&self, answers: &Answers) -> Result<Option<Answers>, JobError>;
}

impl<F> Hook for F
where
    F: Fn(&Answers) -> Result<Option<Answers>, JobError>,
{
    fn call(&self, answers: &Answers) -> Result<Option<Answers>, JobError> {
        self(answers)
    }
}

/// A fixed answer set injected as-is.
impl Hook for Answers {
    fn call(&self, _answers: &Answers) -> Result<Option<Answers>, JobError> {
        Ok(Some(self.clone()))
    }
}

struct WorkflowEntry {
    name: String,
    description: Option<String>,
    source: Box<dyn QuestionSource>,
}

/// Registration context owned by exactly one run.
#[derive(Default)]
pub struct Registration {
    workflows: Vec<WorkflowEntry>,
    flows: Vec<WorkflowEntry>,
    hooks: BTreeMap<(String, Phase), Box<dyn Hook>>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a selectable workflow; it can also be chained into.
    pub fn workflow(
        &mut self,
        name: impl Into<String>,
        source: impl QuestionSource + 'static,
    ) -> &mut Self {
        self.workflow_described(name, None, source)
    }

    pub fn workflow_described(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
        source: impl QuestionSource + 'static,
    ) -> &mut Self {
        insert_entry(
            &mut self.workflows,
            WorkflowEntry {
                name: name.into(),
                description,
                source: Box::new(source),
            },
        );
        self
    }

    /// Register a flow reachable only through chaining.
    pub fn flow(
        &mut self,
        name: impl Into<String>,
        source: impl QuestionSource + 'static,
    ) -> &mut Self {
        insert_entry(
            &mut self.flows,
            WorkflowEntry {
                name: name.into(),
                description: None,
                source: Box::new(source),
            },
        );
        self
    }

    /// Bind a hook to a workflow name ([`GLOBAL_HOOK`] for the whole run).
    pub fn hook(
        &mut self,
        target: impl Into<String>,
        phase: Phase,
        hook: impl Hook + 'static,
    ) -> &mut Self {
        let target = target.into();
        debug!(target = %target, %phase, "hook registered");
        self.hooks.insert((target, phase), Box::new(hook));
        self
    }

    pub fn has_workflows(&self) -> bool {
        !self.workflows.is_empty()
    }

    /// Selectable workflow names in declaration order.
    pub fn workflow_names(&self) -> Vec<&str> {
        self.workflows.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn workflow_description(&self, name: &str) -> Option<&str> {
        self.workflows
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.description.as_deref())
    }

    pub fn is_selectable(&self, name: &str) -> bool {
        self.workflows.iter().any(|entry| entry.name == name)
    }

    /// True when `name` resolves to a workflow or a chain-only flow.
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn has_hook(&self, target: &str, phase: Phase) -> bool {
        self.hooks.contains_key(&(target.to_string(), phase))
    }

    /// Questions for a workflow or flow.
    pub fn questions(&self, name: &str, answers: &Answers) -> Result<Vec<Question>, JobError> {
        self.entry(name)
            .ok_or_else(|| JobError::UnresolvedWorkflow {
                name: name.to_string(),
            })?
            .source
            .questions(answers)
    }

    /// Run the hook bound to `target`/`phase`, merging its output. Returns whether one ran.
    pub fn apply_hook(
        &self,
        target: &str,
        phase: Phase,
        answers: &mut Answers,
    ) -> Result<bool, JobError> {
        let Some(hook) = self.hooks.get(&(target.to_string(), phase)) else {
            return Ok(false);
        };
        debug!(target = %target, %phase, "running hook");
        if let Some(update) = hook.call(answers)? {
            merge(answers, update);
        }
        Ok(true)
    }

    /// Forget every selectable workflow; selection is one-shot per run.
    pub fn drain_workflows(&mut self) {
        self.workflows.clear();
    }

    fn entry(&self, name: &str) -> Option<&WorkflowEntry> {
        self.workflows
            .iter()
            .chain(&self.flows)
            .find(|entry| entry.name == name)
    }
}

fn insert_entry(entries: &mut Vec<WorkflowEntry>, entry: WorkflowEntry) {
    match entries.iter_mut().find(|existing| existing.name == entry.name) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("workflows", &self.workflow_names())
            .field(
                "flows",
                &self
                    .flows
                    .iter()
                    .map(|entry| entry.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}
