//! Promptable units: the flat, ordered form of a question list that a prompt
//! renderer consumes one entry at a time.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::answers::{Answers, truthy, value_to_display};
use crate::spec::question::{Choice, Question, parse_integer, within_bounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Directory,
    File,
}

/// How a prompt collects its answer.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptKind {
    Text,
    Integer {
        minval: Option<i64>,
        maxval: Option<i64>,
    },
    List {
        choices: Vec<Choice>,
    },
    Checkbox {
        choices: Vec<Choice>,
    },
    Path {
        kind: PathKind,
        exists: Option<bool>,
    },
    Confirm,
    /// Never shown; resolves to the default.
    Hidden,
}

/// Skip the prompt when `variable` was answered with `answered`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreWhen {
    pub variable: String,
    pub answered: bool,
}

/// A single promptable unit produced by flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub name: String,
    pub message: String,
    pub default: Option<Value>,
    pub kind: PromptKind,
    /// Gates inherited from every enclosing boolean list.
    pub ignore_when: Vec<IgnoreWhen>,
}

impl Prompt {
    /// True when the prompt must be skipped given the answers collected so far.
    pub fn is_ignored(&self, answers: &Answers) -> bool {
        matches!(self.kind, PromptKind::Hidden)
            || self
                .ignore_when
                .iter()
                .any(|gate| truthy(answers.get(&gate.variable)) == gate.answered)
    }

    /// Value recorded for a skipped prompt.
    pub fn hidden_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

impl Question {
    /// Convert to promptable units; a boolean list expands recursively.
    pub fn to_prompts(&self) -> Vec<Prompt> {
        let mut prompts = Vec::new();
        self.push_prompts(&[], &mut prompts);
        prompts
    }

    fn push_prompts(&self, ignore_when: &[IgnoreWhen], out: &mut Vec<Prompt>) {
        let kind = match self {
            Question::Text(_) => PromptKind::Text,
            Question::Integer(q) => PromptKind::Integer {
                minval: q.minval,
                maxval: q.maxval,
            },
            Question::List(q) => PromptKind::List {
                choices: q.choices.clone(),
            },
            Question::Checkbox(q) => PromptKind::Checkbox {
                choices: q.choices.clone(),
            },
            Question::Directory(q) => PromptKind::Path {
                kind: PathKind::Directory,
                exists: q.exists,
            },
            Question::File(q) => PromptKind::Path {
                kind: PathKind::File,
                exists: q.exists,
            },
            Question::Confirm(_) | Question::BooleanList(_) => PromptKind::Confirm,
            Question::Const(_) => PromptKind::Hidden,
        };
        out.push(Prompt {
            name: self.variablename().to_string(),
            message: self.message().to_string(),
            default: self.default_value(),
            kind,
            ignore_when: ignore_when.to_vec(),
        });

        if let Question::BooleanList(list) = self {
            let branch = |answered: bool| {
                let mut gates = ignore_when.to_vec();
                gates.push(IgnoreWhen {
                    variable: list.variablename().to_string(),
                    answered,
                });
                gates
            };
            let false_gates = branch(true);
            for question in list.whenfalse() {
                question.push_prompts(&false_gates, out);
            }
            let true_gates = branch(false);
            for question in list.whentrue() {
                question.push_prompts(&true_gates, out);
            }
        }
    }
}

/// Flatten a question list into promptable units, preserving document order.
pub fn flatten(questions: &[Question]) -> Vec<Prompt> {
    let mut prompts = Vec::new();
    for question in questions {
        question.push_prompts(&[], &mut prompts);
    }
    prompts
}

/// A rejected candidate answer; the prompt is asked again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub question_id: String,
    pub message: String,
    pub code: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.question_id, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn rejection(prompt: &Prompt, message: &str, code: &str) -> ValidationError {
    ValidationError {
        question_id: prompt.name.clone(),
        message: message.into(),
        code: code.into(),
    }
}

/// Check and normalize a candidate answer for `prompt`.
pub fn check_answer(prompt: &Prompt, value: Value) -> Result<Value, ValidationError> {
    match &prompt.kind {
        PromptKind::Text | PromptKind::Path { .. } => match value {
            Value::String(_) => Ok(value),
            Value::Number(_) | Value::Bool(_) => Ok(Value::String(value_to_display(&value))),
            _ => Err(rejection(prompt, "expected text", "type_mismatch")),
        },
        PromptKind::Integer { minval, maxval } => {
            let number = parse_integer(&value)
                .ok_or_else(|| rejection(prompt, "expected a whole number", "type_mismatch"))?;
            if within_bounds(*minval, *maxval, number) {
                Ok(Value::from(number))
            } else if minval.is_some_and(|min| number < min) {
                Err(rejection(prompt, "value below minimum", "min"))
            } else {
                Err(rejection(prompt, "value above maximum", "max"))
            }
        }
        PromptKind::List { choices } => choices
            .iter()
            .find(|choice| choice.accepts(&value))
            .map(|choice| choice.value().clone())
            .ok_or_else(|| rejection(prompt, "invalid choice", "choice_mismatch")),
        PromptKind::Checkbox { choices } => {
            let items = match value {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                single => vec![single],
            };
            items
                .iter()
                .map(|item| {
                    choices
                        .iter()
                        .find(|choice| choice.accepts(item))
                        .map(|choice| choice.value().clone())
                        .ok_or_else(|| rejection(prompt, "invalid choice", "choice_mismatch"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        PromptKind::Confirm => match &value {
            Value::Bool(_) => Ok(value),
            Value::String(text) => parse_flag(text)
                .map(Value::Bool)
                .ok_or_else(|| rejection(prompt, "expected yes or no", "type_mismatch")),
            _ => Err(rejection(prompt, "expected yes or no", "type_mismatch")),
        },
        PromptKind::Hidden => Ok(value),
    }
}

/// Yes/no spellings accepted from terminals and web forms.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::question::{BooleanList, Checkbox, Const, Integer, List, Text};
    use serde_json::json;

    fn prompt_for(question: impl Into<Question>) -> Prompt {
        question.into().to_prompts().remove(0)
    }

    #[test]
    fn boolean_list_orders_false_branch_first() {
        let question: Question = BooleanList::new(
            "gpus",
            "Use GPUs?",
            vec![Text::new("gpu_type", "GPU type").into()],
            vec![Text::new("cores", "Cores").into()],
        )
        .unwrap()
        .into();
        let prompts = question.to_prompts();
        let names: Vec<_> = prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["gpus", "cores", "gpu_type"]);
        assert!(prompts[1].ignore_when[0].answered);
        assert!(!prompts[2].ignore_when[0].answered);
    }

    #[test]
    fn gates_follow_the_parent_answer() {
        let question: Question = BooleanList::new(
            "gpus",
            "Use GPUs?",
            vec![Text::new("gpu_type", "GPU type").into()],
            vec![Text::new("cores", "Cores").into()],
        )
        .unwrap()
        .into();
        let prompts = question.to_prompts();
        let mut answers = Answers::new();
        answers.insert("gpus".into(), json!(true));
        assert!(prompts[1].is_ignored(&answers));
        assert!(!prompts[2].is_ignored(&answers));
        answers.insert("gpus".into(), json!(false));
        assert!(!prompts[1].is_ignored(&answers));
        assert!(prompts[2].is_ignored(&answers));
    }

    #[test]
    fn const_prompts_are_always_ignored() {
        let prompt = prompt_for(Const::new("partition", "short"));
        assert!(prompt.is_ignored(&Answers::new()));
        assert_eq!(prompt.hidden_value(), json!("short"));
    }

    #[test]
    fn integer_answers_are_normalized_and_bounded() {
        let prompt = prompt_for(Integer::new("memory", "Memory").with_bounds(Some(1), Some(8)));
        assert_eq!(check_answer(&prompt, json!("4")).unwrap(), json!(4));
        assert_eq!(check_answer(&prompt, json!(0)).unwrap_err().code, "min");
        assert_eq!(check_answer(&prompt, json!(9)).unwrap_err().code, "max");
        assert_eq!(
            check_answer(&prompt, json!("x")).unwrap_err().code,
            "type_mismatch"
        );
    }

    #[test]
    fn list_answers_map_labels_to_values() {
        let prompt = prompt_for(List::new(
            "workflow",
            "What do you want to do?",
            [
                Choice::labeled("Debug session", "debug"),
                Choice::labeled("Run femfat", "run"),
            ],
        ));
        assert_eq!(
            check_answer(&prompt, json!("Run femfat")).unwrap(),
            json!("run")
        );
        assert!(check_answer(&prompt, json!("other")).is_err());
    }

    #[test]
    fn checkbox_answers_must_all_be_choices() {
        let prompt = prompt_for(Checkbox::new(
            "multi",
            "Choose many",
            ["ett", "två", "tre"].map(Choice::plain),
        ));
        assert_eq!(
            check_answer(&prompt, json!(["ett", "tre"])).unwrap(),
            json!(["ett", "tre"])
        );
        assert_eq!(check_answer(&prompt, Value::Null).unwrap(), json!([]));
        assert!(check_answer(&prompt, json!(["fyra"])).is_err());
    }
}
