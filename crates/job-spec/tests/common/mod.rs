#![allow(dead_code)]

use std::collections::VecDeque;

use job_spec::{Answers, ApplicationSpec, Prompt, PromptError, Prompter, ValidationError};
use serde_json::Value;

pub fn fixture(name: &str) -> &'static str {
    match name {
        "simple_app" => include_str!("../fixtures/simple_app.json"),
        "harder_app" => include_str!("../fixtures/harder_app.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

pub fn app(name: &str) -> ApplicationSpec {
    serde_json::from_str(fixture(name)).expect("deserialize")
}

/// Answers prompts from a queue and records what it was asked; cancels when the queue runs dry.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    replies: VecDeque<Value>,
    pub asked: Vec<String>,
    pub rejected: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(replies: impl IntoIterator<Item = Value>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            ..Default::default()
        }
    }

    /// A prompter that must never be asked anything.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, prompt: &Prompt, _answers: &Answers) -> Result<Value, PromptError> {
        self.asked.push(prompt.name.clone());
        self.replies.pop_front().ok_or(PromptError::Cancelled)
    }

    fn rejected(&mut self, prompt: &Prompt, _error: &ValidationError) {
        self.rejected.push(prompt.name.clone());
    }
}

pub fn answers(value: Value) -> Answers {
    value.as_object().cloned().expect("answers must be an object")
}
