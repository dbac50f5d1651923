//! Answer resolution: each flattened prompt is satisfied by exactly one tier,
//! prior answers first, then defaults when fast-forwarding, then the prompter.

use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::answers::{Answers, value_to_display};
use crate::error::JobError;
use crate::prompt::{Prompt, ValidationError, check_answer, flatten};
use crate::spec::question::Question;

/// Failure reported by a [`Prompter`].
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("cancelled by user")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

impl From<PromptError> for JobError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Cancelled => JobError::Cancelled,
            PromptError::Failed(message) => JobError::Prompt(message),
        }
    }
}

/// The interactive side of resolution: asks a human for one answer at a time.
pub trait Prompter {
    /// Ask `prompt`; `answers` holds everything known so far in the run.
    fn ask(&mut self, prompt: &Prompt, answers: &Answers) -> Result<Value, PromptError>;

    /// Called when an answer failed validation, before the prompt is asked again.
    fn rejected(&mut self, _prompt: &Prompt, _error: &ValidationError) {}
}

impl<P: Prompter + ?Sized> Prompter for &mut P {
    fn ask(&mut self, prompt: &Prompt, answers: &Answers) -> Result<Value, PromptError> {
        (**self).ask(prompt, answers)
    }

    fn rejected(&mut self, prompt: &Prompt, error: &ValidationError) {
        (**self).rejected(prompt, error)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Take non-null defaults instead of prompting.
    pub fast_forward: bool,
}

/// Result of resolving one question list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub answers: Answers,
    /// Names satisfied from prior answers.
    pub prefilled: Vec<String>,
    /// Names satisfied by defaults in fast-forward mode.
    pub defaults_used: Vec<String>,
    /// Names the prompter was asked for.
    pub asked: Vec<String>,
    /// Names skipped by a gate or hidden, recorded with their default.
    pub hidden: Vec<String>,
}

/// Resolve `questions` against `prior` answers.
///
/// `context` is the run's accumulated answer map; it is visible to the
/// prompter and to gate evaluation but is not copied into the result.
pub fn resolve<P: Prompter + ?Sized>(
    questions: &[Question],
    prior: &Answers,
    context: &Answers,
    options: ResolveOptions,
    prompter: &mut P,
) -> Result<Resolution, JobError> {
    let prompts = flatten(questions);
    warn_duplicates(&prompts);

    let mut resolution = Resolution::default();
    let mut pending = Vec::new();
    for prompt in prompts {
        if let Some(value) = prior.get(&prompt.name) {
            debug!(name = %prompt.name, "answer taken from answer file");
            resolution.answers.insert(prompt.name.clone(), value.clone());
            resolution.prefilled.push(prompt.name);
            continue;
        }
        if options.fast_forward
            && let Some(default) = prompt.default.as_ref().filter(|value| !value.is_null())
        {
            info!("Default used: {}={}", prompt.name, value_to_display(default));
            resolution.answers.insert(prompt.name.clone(), default.clone());
            resolution.defaults_used.push(prompt.name);
            continue;
        }
        pending.push(prompt);
    }

    if pending.is_empty() {
        return Ok(resolution);
    }

    let mut scope = context.clone();
    scope.extend(resolution.answers.clone());
    for prompt in pending {
        let value = if prompt.is_ignored(&scope) {
            debug!(name = %prompt.name, "prompt skipped");
            resolution.hidden.push(prompt.name.clone());
            prompt.hidden_value()
        } else {
            resolution.asked.push(prompt.name.clone());
            ask_until_valid(&prompt, &scope, prompter)?
        };
        scope.insert(prompt.name.clone(), value.clone());
        resolution.answers.insert(prompt.name, value);
    }
    Ok(resolution)
}

fn ask_until_valid<P: Prompter + ?Sized>(
    prompt: &Prompt,
    scope: &Answers,
    prompter: &mut P,
) -> Result<Value, JobError> {
    loop {
        let raw = prompter.ask(prompt, scope)?;
        match check_answer(prompt, raw) {
            Ok(value) => return Ok(value),
            Err(err) => {
                debug!(name = %prompt.name, code = %err.code, "answer rejected");
                prompter.rejected(prompt, &err);
            }
        }
    }
}

fn warn_duplicates(prompts: &[Prompt]) {
    let mut seen = BTreeSet::new();
    for prompt in prompts {
        if !seen.insert(prompt.name.as_str()) {
            warn!(name = %prompt.name, "variable name used more than once; later answer wins");
        }
    }
}
