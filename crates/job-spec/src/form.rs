//! Web form conversion: questions become form field descriptors, and a
//! submitted form is collapsed back into a flat answer map.

use serde::Serialize;
use serde_json::{Value, json};

use crate::answers::{Answers, WORKFLOW_KEY};
use crate::prompt::{Prompt, PromptKind, ValidationError, check_answer, parse_flag};
use crate::spec::question::{BooleanList, Choice, Question};
use crate::template::TEMPLATE_KEY;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormChoice {
    pub value: Value,
    pub label: String,
}

impl From<&Choice> for FormChoice {
    fn from(choice: &Choice) -> Self {
        Self {
            value: choice.value().clone(),
            label: choice.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Select {
        choices: Vec<FormChoice>,
    },
    Multiselect {
        choices: Vec<FormChoice>,
    },
    Path {
        directory: bool,
    },
    /// `toggles` marks the flag of a boolean list; flipping it swaps the sub-forms.
    Checkbox {
        toggles: bool,
    },
    Hidden,
    Subform {
        fields: Vec<FormField>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    /// Element id, set on fields nested in a boolean list sub-form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub required: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Extra fields of a page besides its questions.
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    /// Available template names; empty on workflow pages.
    pub templates: Vec<String>,
    pub default_template: Option<String>,
    /// Selectable workflows offered at the bottom of the page.
    pub workflows: Vec<String>,
}

/// Convert questions into form fields, in document order.
pub fn build_form(questions: &[Question]) -> Vec<FormField> {
    let mut fields = Vec::new();
    for question in questions {
        push_fields(question, None, &mut fields);
    }
    fields
}

/// Form for a whole page: template picker, question fields, workflow picker.
pub fn build_page(questions: &[Question], options: &PageOptions) -> Vec<FormField> {
    let mut fields = Vec::new();
    match options.templates.as_slice() {
        [] => {}
        [only] => fields.push(FormField {
            name: TEMPLATE_KEY.into(),
            label: String::new(),
            id: None,
            default: Some(Value::String(only.clone())),
            required: false,
            kind: FieldKind::Hidden,
        }),
        several => fields.push(FormField {
            name: TEMPLATE_KEY.into(),
            label: "Select template".into(),
            id: None,
            default: options.default_template.clone().map(Value::String),
            required: true,
            kind: FieldKind::Select {
                choices: several
                    .iter()
                    .map(|name| FormChoice {
                        value: Value::String(name.clone()),
                        label: name.clone(),
                    })
                    .collect(),
            },
        }),
    }

    fields.extend(build_form(questions));

    if !options.workflows.is_empty() {
        let mut choices = vec![FormChoice {
            value: Value::String(String::new()),
            label: "--- Select ---".into(),
        }];
        choices.extend(options.workflows.iter().map(|name| FormChoice {
            value: Value::String(name.clone()),
            label: name.clone(),
        }));
        fields.push(FormField {
            name: WORKFLOW_KEY.into(),
            label: "Select workflow".into(),
            id: None,
            default: None,
            required: true,
            kind: FieldKind::Select { choices },
        });
    }
    fields
}

pub fn form_json(fields: &[FormField]) -> Value {
    json!({ "fields": fields })
}

fn push_fields(question: &Question, id: Option<String>, out: &mut Vec<FormField>) {
    let kind = match question {
        Question::Text(_) => FieldKind::Text,
        Question::Integer(q) => FieldKind::Integer {
            min: q.minval,
            max: q.maxval,
        },
        Question::List(q) => FieldKind::Select {
            choices: q.choices.iter().map(FormChoice::from).collect(),
        },
        Question::Checkbox(q) => FieldKind::Multiselect {
            choices: q.choices.iter().map(FormChoice::from).collect(),
        },
        Question::Directory(_) => FieldKind::Path { directory: true },
        Question::File(_) => FieldKind::Path { directory: false },
        Question::Confirm(_) => FieldKind::Checkbox { toggles: false },
        Question::BooleanList(_) => FieldKind::Checkbox { toggles: true },
        Question::Const(_) => FieldKind::Hidden,
    };
    out.push(FormField {
        name: question.variablename().to_string(),
        label: question.message().to_string(),
        id,
        default: question.default_value(),
        required: matches!(question, Question::Text(_) | Question::Integer(_)),
        kind,
    });

    if let Question::BooleanList(list) = question {
        let name = list.variablename();
        let mut next_id = 0;
        let mut falseform = Vec::new();
        for nested in list.whenfalse() {
            push_fields(nested, Some(format!("{name}_false_{next_id}")), &mut falseform);
            next_id += 1;
        }
        let mut trueform = Vec::new();
        for nested in list.whentrue() {
            push_fields(nested, Some(format!("{name}_true_{next_id}")), &mut trueform);
            next_id += 1;
        }
        out.push(subform(format!("{name}_trueform"), trueform));
        out.push(subform(format!("{name}_falseform"), falseform));
    }
}

fn subform(name: String, fields: Vec<FormField>) -> FormField {
    FormField {
        name,
        label: String::new(),
        id: None,
        default: None,
        required: false,
        kind: FieldKind::Subform { fields },
    }
}

/// Validate a submitted page and flatten boolean list sub-forms into one answer map.
///
/// Nested answers are read from the `<name>_trueform`/`<name>_falseform` objects,
/// falling back to top-level keys. Questions on the branch not taken get their defaults.
pub fn collect_submission(
    questions: &[Question],
    submission: &Answers,
) -> Result<Answers, Vec<ValidationError>> {
    let mut answers = Answers::new();
    let mut errors = Vec::new();
    for question in questions {
        collect(question, submission, &mut answers, &mut errors);
    }
    if errors.is_empty() {
        Ok(answers)
    } else {
        Err(errors)
    }
}

fn collect(
    question: &Question,
    submission: &Answers,
    answers: &mut Answers,
    errors: &mut Vec<ValidationError>,
) {
    let Some(prompt) = question.to_prompts().into_iter().next() else {
        return;
    };
    if let Question::BooleanList(list) = question {
        collect_boolean_list(list, &prompt, submission, answers, errors);
        return;
    }
    match field_value(&prompt, submission.get(&prompt.name)) {
        Ok(value) => {
            answers.insert(prompt.name, value);
        }
        Err(err) => errors.push(err),
    }
}

fn collect_boolean_list(
    list: &BooleanList,
    prompt: &Prompt,
    submission: &Answers,
    answers: &mut Answers,
    errors: &mut Vec<ValidationError>,
) {
    let flag = match field_value(prompt, submission.get(&prompt.name)) {
        Ok(Value::Bool(flag)) => flag,
        Ok(_) => false,
        Err(err) => {
            errors.push(err);
            return;
        }
    };
    answers.insert(prompt.name.clone(), Value::Bool(flag));

    let (taken, skipped, form) = if flag {
        (list.whentrue(), list.whenfalse(), "trueform")
    } else {
        (list.whenfalse(), list.whentrue(), "falseform")
    };
    let nested = match submission.get(&format!("{}_{form}", prompt.name)) {
        Some(Value::Object(subform)) => subform,
        _ => submission,
    };
    for question in taken {
        collect(question, nested, answers, errors);
    }
    for question in skipped {
        for hidden in question.to_prompts() {
            answers
                .entry(hidden.name.clone())
                .or_insert_with(|| hidden.hidden_value());
        }
    }
}

fn field_value(prompt: &Prompt, submitted: Option<&Value>) -> Result<Value, ValidationError> {
    match (&prompt.kind, submitted) {
        (PromptKind::Hidden, _) => Ok(prompt.hidden_value()),
        // Browsers omit unchecked checkboxes.
        (PromptKind::Confirm, None | Some(Value::Null)) => Ok(Value::Bool(false)),
        (PromptKind::Confirm, Some(Value::String(text))) if text.is_empty() => {
            Ok(Value::Bool(false))
        }
        (PromptKind::Confirm, Some(Value::String(text))) => Ok(Value::Bool(
            parse_flag(text).unwrap_or(true),
        )),
        (PromptKind::Checkbox { .. }, None) => check_answer(prompt, Value::Null),
        (PromptKind::Text | PromptKind::Integer { .. }, None | Some(Value::Null)) => {
            Err(missing(prompt))
        }
        (PromptKind::Text | PromptKind::Integer { .. }, Some(Value::String(text)))
            if text.trim().is_empty() =>
        {
            Err(missing(prompt))
        }
        (_, None | Some(Value::Null)) => match &prompt.default {
            Some(default) => Ok(default.clone()),
            None => check_answer(prompt, Value::String(String::new())),
        },
        (_, Some(value)) => check_answer(prompt, value.clone()),
    }
}

fn missing(prompt: &Prompt) -> ValidationError {
    ValidationError {
        question_id: prompt.name.clone(),
        message: "this field is required".into(),
        code: "required".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::question::{Const, Integer, List, Text};

    fn gpu_question() -> Question {
        BooleanList::new(
            "gpus",
            "Use GPUs?",
            vec![
                Text::new("gpu_type", "GPU type").into(),
                Integer::new("gpu_count", "GPUs").with_bounds(Some(1), Some(4)).into(),
            ],
            vec![Text::new("cores", "Cores").with_default("4").into()],
        )
        .unwrap()
        .into()
    }

    fn submission(value: Value) -> Answers {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn boolean_list_emits_toggle_and_subforms() {
        let fields = build_form(&[gpu_question()]);
        let names: Vec<_> = fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(names, ["gpus", "gpus_trueform", "gpus_falseform"]);
        assert_eq!(fields[0].kind, FieldKind::Checkbox { toggles: true });

        let FieldKind::Subform { fields: trueform } = &fields[1].kind else {
            panic!("expected a sub-form");
        };
        let ids: Vec<_> = trueform.iter().filter_map(|field| field.id.as_deref()).collect();
        assert_eq!(ids, ["gpus_true_1", "gpus_true_2"]);
    }

    #[test]
    fn page_adds_template_and_workflow_fields() {
        let questions = vec![Question::from(Text::new("jobname", "Job name"))];
        let options = PageOptions {
            templates: vec!["job_template.hbs".into()],
            default_template: None,
            workflows: vec!["debug".into()],
        };
        let fields = build_page(&questions, &options);
        assert_eq!(fields[0].name, "template");
        assert_eq!(fields[0].kind, FieldKind::Hidden);
        let last = fields.last().unwrap();
        assert_eq!(last.name, "workflow");
        let value = form_json(&fields);
        assert_eq!(value["fields"][1]["type"], "text");
        assert_eq!(value["fields"][2]["choices"][1]["value"], "debug");
    }

    #[test]
    fn submission_collapses_the_taken_branch() {
        let answers = collect_submission(
            &[gpu_question()],
            &submission(json!({
                "gpus": "y",
                "gpus_trueform": { "gpu_type": "a100", "gpu_count": "2" }
            })),
        )
        .unwrap();
        assert_eq!(answers["gpus"], json!(true));
        assert_eq!(answers["gpu_type"], json!("a100"));
        assert_eq!(answers["gpu_count"], json!(2));
        assert_eq!(answers["cores"], json!("4"));
    }

    #[test]
    fn unchecked_toggle_reads_the_false_branch() {
        let answers = collect_submission(
            &[gpu_question()],
            &submission(json!({ "gpus_falseform": { "cores": "16" } })),
        )
        .unwrap();
        assert_eq!(answers["gpus"], json!(false));
        assert_eq!(answers["cores"], json!("16"));
        assert_eq!(answers["gpu_type"], Value::Null);
    }

    #[test]
    fn submission_reports_every_invalid_field() {
        let questions = vec![
            Question::from(Text::new("jobname", "Job name")),
            Integer::new("memory", "Memory").with_bounds(Some(1), Some(8)).into(),
            List::new("partition", "Partition", ["short", "long"].map(Choice::plain)).into(),
            Const::new("account", "hpc").into(),
        ];
        let errors = collect_submission(
            &questions,
            &submission(json!({ "jobname": "", "memory": "64", "partition": "medium" })),
        )
        .unwrap_err();
        let codes: Vec<_> = errors.iter().map(|err| err.code.as_str()).collect();
        assert_eq!(codes, ["required", "max", "choice_mismatch"]);
    }
}
