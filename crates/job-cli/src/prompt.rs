use std::io::{BufRead, Write};
use std::path::Path;

use job_spec::spec::question::Choice;
use job_spec::{
    Answers, PathKind, Prompt, PromptError, PromptKind, Prompter, ValidationError, parse_flag,
    value_to_display,
};
use serde_json::{Number, Value};
use tracing::warn;

const EXIT_WORD: &str = "exit";

/// Line-oriented prompter: questions go to `output`, answers come from `input`.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn show(&mut self, prompt: &Prompt) -> Result<(), PromptError> {
        let choices: &[Choice] = match &prompt.kind {
            PromptKind::List { choices } | PromptKind::Checkbox { choices } => choices.as_slice(),
            _ => &[],
        };
        for (index, choice) in choices.iter().enumerate() {
            writeln!(self.output, "  {}) {}", index + 1, choice.label()).map_err(io_failure)?;
        }
        let hint = match &prompt.kind {
            PromptKind::Checkbox { .. } => " (comma separated)",
            PromptKind::Confirm => " (y/n)",
            _ => "",
        };
        let written = match default_text(prompt) {
            Some(default) => write!(self.output, "{}{} [{}]: ", prompt.message, hint, default),
            None => write!(self.output, "{}{}: ", prompt.message, hint),
        };
        written.map_err(io_failure)?;
        self.output.flush().map_err(io_failure)
    }

    fn read_reply(&mut self) -> Result<String, PromptError> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(io_failure)?;
        if read == 0 {
            return Err(PromptError::Cancelled);
        }
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case(EXIT_WORD) {
            return Err(PromptError::Cancelled);
        }
        Ok(trimmed.to_string())
    }

    fn invalid(&mut self, message: &str) -> Result<(), PromptError> {
        writeln!(self.output, "Invalid answer: {}", message).map_err(io_failure)
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn ask(&mut self, prompt: &Prompt, _answers: &Answers) -> Result<Value, PromptError> {
        loop {
            self.show(prompt)?;
            let raw = self.read_reply()?;
            let value = match parse_reply(prompt, &raw) {
                Ok(value) => value,
                Err(message) => {
                    self.invalid(&message)?;
                    continue;
                }
            };
            if let Err(message) = check_path(prompt, &value) {
                self.invalid(&message)?;
                continue;
            }
            return Ok(value);
        }
    }

    fn rejected(&mut self, prompt: &Prompt, error: &ValidationError) {
        if let Err(err) = self.invalid(&error.message) {
            warn!(question = %prompt.name, error = %err, "could not report invalid answer");
        }
    }
}

fn io_failure(err: std::io::Error) -> PromptError {
    PromptError::Failed(err.to_string())
}

fn default_text(prompt: &Prompt) -> Option<String> {
    match (&prompt.kind, prompt.default.as_ref()?) {
        (_, Value::Null) => None,
        (PromptKind::Checkbox { .. }, Value::Array(items)) => Some(
            items
                .iter()
                .map(value_to_display)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        (PromptKind::Confirm, Value::Bool(true)) => Some("Y/n".into()),
        (PromptKind::Confirm, Value::Bool(false)) => Some("y/N".into()),
        (_, value) => Some(value_to_display(value)),
    }
}

/// Turn one typed line into a candidate answer. Blank input takes the default.
pub fn parse_reply(prompt: &Prompt, raw: &str) -> Result<Value, String> {
    if raw.is_empty() {
        if let Some(default) = prompt.default.as_ref().filter(|value| !value.is_null()) {
            return Ok(default.clone());
        }
        return match &prompt.kind {
            PromptKind::Text | PromptKind::Path { .. } => Ok(Value::String(String::new())),
            PromptKind::Checkbox { .. } => Ok(Value::Array(Vec::new())),
            PromptKind::Hidden => Ok(Value::Null),
            PromptKind::Integer { .. } => Err("Please enter a whole number.".into()),
            PromptKind::Confirm => Err("Please enter yes or no.".into()),
            PromptKind::List { .. } => Err("Please pick one of the choices.".into()),
        };
    }

    match &prompt.kind {
        PromptKind::Text | PromptKind::Path { .. } | PromptKind::Hidden => {
            Ok(Value::String(raw.to_string()))
        }
        PromptKind::Integer { .. } => raw
            .parse::<i64>()
            .map(|number| Value::Number(Number::from(number)))
            .map_err(|_| "Please enter a whole number.".to_string()),
        PromptKind::Confirm => parse_flag(raw)
            .map(Value::Bool)
            .ok_or_else(|| "Please enter yes or no.".to_string()),
        PromptKind::List { choices } => Ok(pick(choices, raw)),
        PromptKind::Checkbox { choices } => Ok(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| pick(choices, item))
                .collect(),
        )),
    }
}

/// A 1-based index selects that choice; anything else is matched later by value or label.
fn pick(choices: &[Choice], raw: &str) -> Value {
    let by_index = raw
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| choices.get(index));
    let candidate = Value::String(raw.to_string());
    match by_index {
        Some(choice) if !choices.iter().any(|other| other.accepts(&candidate)) => {
            choice.value().clone()
        }
        _ => candidate,
    }
}

fn check_path(prompt: &Prompt, value: &Value) -> Result<(), String> {
    let PromptKind::Path {
        kind,
        exists: Some(expected),
    } = &prompt.kind
    else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Ok(());
    };
    let path = Path::new(text);
    let (present, noun) = match kind {
        PathKind::Directory => (path.is_dir(), "Directory"),
        PathKind::File => (path.is_file(), "File"),
    };
    match (*expected, present) {
        (true, false) => Err(format!("{} '{}' does not exist.", noun, text)),
        (false, true) => Err(format!("{} '{}' already exists.", noun, text)),
        _ => Ok(()),
    }
}
