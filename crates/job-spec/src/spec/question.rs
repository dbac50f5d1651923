use std::borrow::Cow;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answers::value_to_display;
use crate::error::JobError;

/// One selectable entry of a `List` or `Checkbox` question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Choice {
    /// `[label, value]`: the label is shown, the value is stored.
    Labeled(String, Value),
    Plain(Value),
}

impl Choice {
    pub fn plain(value: impl Into<Value>) -> Self {
        Choice::Plain(value.into())
    }

    pub fn labeled(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Choice::Labeled(label.into(), value.into())
    }

    pub fn value(&self) -> &Value {
        match self {
            Choice::Labeled(_, value) | Choice::Plain(value) => value,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Choice::Labeled(label, _) => label.clone(),
            Choice::Plain(value) => value_to_display(value),
        }
    }

    /// Matches the stored value exactly, by its display form, or by label.
    pub fn accepts(&self, candidate: &Value) -> bool {
        if self.value() == candidate {
            return true;
        }
        let display = value_to_display(candidate);
        value_to_display(self.value()) == display
            || matches!(self, Choice::Labeled(label, _) if *label == display)
    }
}

/// Free text answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Text {
    pub variablename: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Text {
    pub fn new(variablename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            variablename: variablename.into(),
            message: message.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Whole number answer with optional inclusive bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Integer {
    pub variablename: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<i64>,
}

impl Integer {
    pub fn new(variablename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            variablename: variablename.into(),
            message: message.into(),
            minval: None,
            maxval: None,
            default: None,
        }
    }

    pub fn with_bounds(mut self, minval: Option<i64>, maxval: Option<i64>) -> Self {
        self.minval = minval;
        self.maxval = maxval;
        self
    }

    pub fn with_default(mut self, default: i64) -> Self {
        self.default = Some(default);
        self
    }

    /// Accepts a raw candidate answer when it is a whole number inside the bounds.
    pub fn validate(&self, raw: &Value) -> bool {
        parse_integer(raw).is_some_and(|value| within_bounds(self.minval, self.maxval, value))
    }
}

pub(crate) fn within_bounds(minval: Option<i64>, maxval: Option<i64>, value: i64) -> bool {
    match (minval, maxval) {
        (Some(min), Some(max)) => min <= value && value <= max,
        (Some(min), None) => min <= value,
        (None, Some(max)) => value <= max,
        (None, None) => true,
    }
}

pub(crate) fn parse_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Exactly one of `choices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct List {
    pub variablename: String,
    pub message: String,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl List {
    pub fn new(
        variablename: impl Into<String>,
        message: impl Into<String>,
        choices: impl IntoIterator<Item = Choice>,
    ) -> Self {
        Self {
            variablename: variablename.into(),
            message: message.into(),
            choices: choices.into_iter().collect(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Zero or more of `choices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Checkbox {
    pub variablename: String,
    pub message: String,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Vec<Value>>,
}

impl Checkbox {
    pub fn new(
        variablename: impl Into<String>,
        message: impl Into<String>,
        choices: impl IntoIterator<Item = Choice>,
    ) -> Self {
        Self {
            variablename: variablename.into(),
            message: message.into(),
            choices: choices.into_iter().collect(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: Vec<Value>) -> Self {
        self.default = Some(default);
        self
    }
}

/// Path to a directory; `exists` asks that it does (true) or does not (false) exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Directory {
    pub variablename: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

/// Path to a regular file; `exists` as for [`Directory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct File {
    pub variablename: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

impl Directory {
    pub fn new(variablename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            variablename: variablename.into(),
            message: message.into(),
            default: None,
            exists: None,
        }
    }

    pub fn must_exist(mut self, exists: bool) -> Self {
        self.exists = Some(exists);
        self
    }
}

impl File {
    pub fn new(variablename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            variablename: variablename.into(),
            message: message.into(),
            default: None,
            exists: None,
        }
    }

    pub fn must_exist(mut self, exists: bool) -> Self {
        self.exists = Some(exists);
        self
    }
}

/// Yes/no answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Confirm {
    pub variablename: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
}

impl Confirm {
    pub fn new(variablename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            variablename: variablename.into(),
            message: message.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: bool) -> Self {
        self.default = Some(default);
        self
    }
}

/// A yes/no answer gating two nested question lists.
///
/// Built only through [`BooleanList::new`] or deserialization, both of which
/// reject a definition where neither branch has questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BooleanListDef", into = "BooleanListDef")]
pub struct BooleanList {
    variablename: String,
    message: String,
    default: Option<bool>,
    whentrue: Vec<Question>,
    whenfalse: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct BooleanListDef {
    variablename: String,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    whentrue: Vec<Question>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    whenfalse: Vec<Question>,
}

impl BooleanList {
    pub fn new(
        variablename: impl Into<String>,
        message: impl Into<String>,
        whentrue: Vec<Question>,
        whenfalse: Vec<Question>,
    ) -> Result<Self, JobError> {
        let variablename = variablename.into();
        if whentrue.is_empty() && whenfalse.is_empty() {
            return Err(JobError::Construction(format!(
                "boolean list '{}' has empty question lists",
                variablename
            )));
        }
        Ok(Self {
            variablename,
            message: message.into(),
            default: None,
            whentrue,
            whenfalse,
        })
    }

    pub fn with_default(mut self, default: bool) -> Self {
        self.default = Some(default);
        self
    }

    pub fn variablename(&self) -> &str {
        &self.variablename
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn default(&self) -> Option<bool> {
        self.default
    }

    pub fn whentrue(&self) -> &[Question] {
        &self.whentrue
    }

    pub fn whenfalse(&self) -> &[Question] {
        &self.whenfalse
    }
}

impl TryFrom<BooleanListDef> for BooleanList {
    type Error = JobError;

    fn try_from(def: BooleanListDef) -> Result<Self, Self::Error> {
        let list = BooleanList::new(def.variablename, def.message, def.whentrue, def.whenfalse)?;
        Ok(match def.default {
            Some(default) => list.with_default(default),
            None => list,
        })
    }
}

impl From<BooleanList> for BooleanListDef {
    fn from(list: BooleanList) -> Self {
        Self {
            variablename: list.variablename,
            message: list.message,
            default: list.default,
            whentrue: list.whentrue,
            whenfalse: list.whenfalse,
        }
    }
}

impl JsonSchema for BooleanList {
    fn schema_name() -> Cow<'static, str> {
        "BooleanList".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        BooleanListDef::json_schema(generator)
    }
}

/// Never asked; always resolves to `default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Const {
    pub variablename: String,
    pub default: Value,
}

impl Const {
    pub fn new(variablename: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            variablename: variablename.into(),
            default: default.into(),
        }
    }
}

/// Declarative question, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    Text(Text),
    Integer(Integer),
    List(List),
    Checkbox(Checkbox),
    Directory(Directory),
    File(File),
    Confirm(Confirm),
    BooleanList(BooleanList),
    Const(Const),
}

impl Question {
    pub fn variablename(&self) -> &str {
        match self {
            Question::Text(q) => &q.variablename,
            Question::Integer(q) => &q.variablename,
            Question::List(q) => &q.variablename,
            Question::Checkbox(q) => &q.variablename,
            Question::Directory(q) => &q.variablename,
            Question::File(q) => &q.variablename,
            Question::Confirm(q) => &q.variablename,
            Question::BooleanList(q) => q.variablename(),
            Question::Const(q) => &q.variablename,
        }
    }

    /// Prompt text; `Const` questions have none.
    pub fn message(&self) -> &str {
        match self {
            Question::Text(q) => &q.message,
            Question::Integer(q) => &q.message,
            Question::List(q) => &q.message,
            Question::Checkbox(q) => &q.message,
            Question::Directory(q) => &q.message,
            Question::File(q) => &q.message,
            Question::Confirm(q) => &q.message,
            Question::BooleanList(q) => q.message(),
            Question::Const(_) => "",
        }
    }

    pub fn default_value(&self) -> Option<Value> {
        match self {
            Question::Text(q) => q.default.clone().map(Value::String),
            Question::Integer(q) => q.default.map(Value::from),
            Question::List(q) => q.default.clone(),
            Question::Checkbox(q) => q.default.clone().map(Value::Array),
            Question::Directory(q) => q.default.clone().map(Value::String),
            Question::File(q) => q.default.clone().map(Value::String),
            Question::Confirm(q) => q.default.map(Value::Bool),
            Question::BooleanList(q) => q.default().map(Value::Bool),
            Question::Const(q) => Some(q.default.clone()),
        }
    }
}

macro_rules! impl_into_question {
    ($($kind:ident),* $(,)?) => {
        $(
            impl From<$kind> for Question {
                fn from(question: $kind) -> Self {
                    Question::$kind(question)
                }
            }
        )*
    };
}

impl_into_question!(
    Text,
    Integer,
    List,
    Checkbox,
    Directory,
    File,
    Confirm,
    BooleanList,
    Const
);
