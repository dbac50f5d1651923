use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::answers::MAIN_FLOW;
use crate::prompt::flatten;
use crate::registry::GLOBAL_HOOK;
use crate::spec::application::ApplicationSpec;
use crate::spec::question::{Question, within_bounds};

static VARIABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name pattern is valid")
});

/// A problem found in an application definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckIssue {
    /// Stage the problem was found in (`mainflow`, a workflow name, or `hooks`).
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub valid: bool,
    pub issues: Vec<CheckIssue>,
}

/// Check an application definition for mistakes that would only surface mid-run.
pub fn check(spec: &ApplicationSpec) -> CheckReport {
    let mut issues = Vec::new();

    if spec.id.trim().is_empty() {
        issues.push(issue("application", None, "application id is empty", "empty_id"));
    }

    check_questions(MAIN_FLOW, &spec.mainflow, &mut issues);

    let mut stage_names = BTreeSet::new();
    for workflow in spec.workflows.iter().chain(&spec.flows) {
        if workflow.name == MAIN_FLOW || workflow.name.is_empty() {
            issues.push(issue(
                &workflow.name,
                None,
                "workflow name is reserved",
                "reserved_name",
            ));
        }
        if !stage_names.insert(workflow.name.as_str()) {
            issues.push(issue(
                &workflow.name,
                None,
                "workflow declared more than once",
                "duplicate_workflow",
            ));
        }
        check_questions(&workflow.name, &workflow.questions, &mut issues);
    }

    for hook in &spec.hooks {
        let known = hook.workflow == GLOBAL_HOOK
            || hook.workflow == MAIN_FLOW
            || stage_names.contains(hook.workflow.as_str());
        if !known {
            issues.push(issue(
                "hooks",
                None,
                &format!("hook targets unknown workflow '{}'", hook.workflow),
                "unknown_hook_target",
            ));
        }
    }

    CheckReport {
        valid: issues.is_empty(),
        issues,
    }
}

fn check_questions(location: &str, questions: &[Question], issues: &mut Vec<CheckIssue>) {
    let mut seen = BTreeSet::new();
    for prompt in flatten(questions) {
        if !seen.insert(prompt.name.clone()) {
            issues.push(issue(
                location,
                Some(&prompt.name),
                "variable name used more than once",
                "duplicate_variable",
            ));
        }
    }
    for question in questions {
        check_question(location, question, issues);
    }
}

fn check_question(location: &str, question: &Question, issues: &mut Vec<CheckIssue>) {
    let name = question.variablename();
    if !VARIABLE_NAME.is_match(name) {
        issues.push(issue(
            location,
            Some(name),
            "variable name is not a valid identifier",
            "invalid_name",
        ));
    }

    match question {
        Question::List(list) => {
            if list.choices.is_empty() {
                issues.push(issue(location, Some(name), "no choices", "empty_choices"));
            } else if let Some(default) = &list.default
                && !list.choices.iter().any(|choice| choice.accepts(default))
            {
                issues.push(issue(
                    location,
                    Some(name),
                    "default is not one of the choices",
                    "default_mismatch",
                ));
            }
        }
        Question::Checkbox(checkbox) => {
            if checkbox.choices.is_empty() {
                issues.push(issue(location, Some(name), "no choices", "empty_choices"));
            } else if let Some(defaults) = &checkbox.default
                && defaults
                    .iter()
                    .any(|item| !checkbox.choices.iter().any(|choice| choice.accepts(item)))
            {
                issues.push(issue(
                    location,
                    Some(name),
                    "default is not one of the choices",
                    "default_mismatch",
                ));
            }
        }
        Question::Integer(integer) => {
            if let (Some(min), Some(max)) = (integer.minval, integer.maxval)
                && min > max
            {
                issues.push(issue(
                    location,
                    Some(name),
                    "minval is greater than maxval",
                    "invalid_bounds",
                ));
            }
            if let Some(default) = integer.default
                && !within_bounds(integer.minval, integer.maxval, default)
            {
                issues.push(issue(
                    location,
                    Some(name),
                    "default is outside the bounds",
                    "default_out_of_bounds",
                ));
            }
        }
        Question::BooleanList(list) => {
            for nested in list.whentrue().iter().chain(list.whenfalse()) {
                check_question(location, nested, issues);
            }
        }
        _ => {}
    }
}

fn issue(location: &str, variable: Option<&str>, message: &str, code: &str) -> CheckIssue {
    CheckIssue {
        location: location.to_string(),
        variable: variable.map(str::to_string),
        message: message.into(),
        code: code.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> ApplicationSpec {
        serde_json::from_value(value).expect("deserialize")
    }

    #[test]
    fn clean_definition_passes() {
        let report = check(&spec(json!({
            "id": "simple",
            "mainflow": [
                { "type": "text", "variablename": "jobname", "message": "Job name" },
                { "type": "integer", "variablename": "memory", "message": "Memory",
                  "minval": 1, "maxval": 64, "default": 8 }
            ],
            "hooks": [{ "workflow": "mainflow", "phase": "post", "set": {} }]
        })));
        assert!(report.valid, "{:?}", report.issues);
    }

    #[test]
    fn reports_names_duplicates_and_bounds() {
        let report = check(&spec(json!({
            "id": "broken",
            "mainflow": [
                { "type": "text", "variablename": "job-name", "message": "Job name" },
                { "type": "boolean_list", "variablename": "gpus", "message": "GPUs?",
                  "whentrue": [{ "type": "text", "variablename": "gpus", "message": "again" }] },
                { "type": "integer", "variablename": "memory", "message": "Memory",
                  "minval": 8, "maxval": 1 }
            ],
            "hooks": [{ "workflow": "nowhere", "phase": "pre" }]
        })));
        let codes: Vec<_> = report.issues.iter().map(|issue| issue.code.as_str()).collect();
        assert!(!report.valid);
        assert!(codes.contains(&"invalid_name"));
        assert!(codes.contains(&"duplicate_variable"));
        assert!(codes.contains(&"invalid_bounds"));
        assert!(codes.contains(&"unknown_hook_target"));
    }

    #[test]
    fn list_default_must_be_a_choice() {
        let report = check(&spec(json!({
            "id": "lists",
            "mainflow": [
                { "type": "list", "variablename": "partition", "message": "Partition",
                  "choices": ["short", "long"], "default": "medium" },
                { "type": "checkbox", "variablename": "mail", "message": "Mail on", "choices": [] }
            ]
        })));
        let codes: Vec<_> = report.issues.iter().map(|issue| issue.code.as_str()).collect();
        assert_eq!(codes, ["default_mismatch", "empty_choices"]);
    }
}
