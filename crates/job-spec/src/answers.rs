
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::JobError;

/// Accumulating answer map keyed by question variable name.
pub type Answers = Map<String, Value>;

/// Control key a stage sets to chain into another workflow.
pub const NEXT_WORKFLOW_KEY: &str = "nextworkflow";
/// Answer file key naming the workflow to select without prompting.
pub const WORKFLOW_KEY: &str = "workflow";
/// Stage name of the unconditional first question sequence.
pub const MAIN_FLOW: &str = "mainflow";

/// Pre-filled answers, optionally pinning the workflow selection and the chain order.
///
/// The same shape is produced when answers are saved, so a saved file can be
/// replayed as an answer file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    /// Chained stages in the order they were visited; a stage may repeat.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
    #[serde(flatten)]
    pub answers: Answers,
}

/// Answers recorded during a run, serializable as a future answer file.
pub type SavedAnswers = AnswerFile;

impl AnswerFile {
    pub fn from_value(value: Value) -> Result<Self, JobError> {
        serde_json::from_value(value).map_err(JobError::AnswerFile)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, JobError> {
        serde_json::from_str(raw).map_err(JobError::AnswerFile)
    }

    /// Layer prefill answers on top of the file contents.
    pub fn with_prefill(mut self, prefill: Answers) -> Self {
        self.record(prefill);
        self
    }

    /// Record resolved answers, routing the `workflow` key into its own field.
    pub fn record(&mut self, answers: Answers) {
        for (key, value) in answers {
            if key == WORKFLOW_KEY
                && let Value::String(name) = &value
            {
                self.workflow = Some(name.clone());
                continue;
            }
            self.answers.insert(key, value);
        }
    }

    /// Answers as seen by the resolver; a pinned workflow also answers a question named `workflow`.
    pub fn prior_answers(&self) -> Answers {
        let mut prior = self.answers.clone();
        if let Some(workflow) = &self.workflow {
            prior
                .entry(WORKFLOW_KEY.to_string())
                .or_insert_with(|| Value::String(workflow.clone()));
        }
        prior
    }
}

/// Merge `update` into `answers`; later values win.
pub fn merge(answers: &mut Answers, update: Answers) {
    for (key, value) in update {
        answers.insert(key, value);
    }
}

/// Truthiness of an answer; absent and null count as false.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|value| value != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Parse `KEY=VALUE` prefill arguments, coercing booleans and numbers.
pub fn parse_prefill<I, S>(arguments: I) -> Result<Answers, JobError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut answers = Answers::new();
    for argument in arguments {
        let argument = argument.as_ref();
        let (key, raw) = argument
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| JobError::Prefill {
                argument: argument.to_string(),
            })?;
        answers.insert(key.trim().to_string(), coerce_prefill_value(raw));
    }
    Ok(answers)
}

fn coerce_prefill_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int_val) = raw.parse::<i64>() {
        return Value::Number(Number::from(int_val));
    }
    if let Ok(float_val) = raw.parse::<f64>()
        && let Some(number) = Number::from_f64(float_val)
    {
        return Value::Number(number);
    }
    Value::String(raw.to_string())
}

/// Render an answer the way a user would type it.
pub fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
