//! JSON step API for the web form flow. Every call takes the application
//! definition and the session `data` as JSON strings and returns JSON; no
//! state is kept between calls.

use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use job_spec::{
    Answers, Application, ApplicationSpec, GLOBAL_HOOK, JobError, MAIN_FLOW, NEXT_WORKFLOW_KEY,
    PageOptions, Phase, Question, Registration, WORKFLOW_KEY, build_page, collect_submission,
    form_json, merge, select_template,
};

const DEFAULT_APP: &str = include_str!("../../job-spec/tests/fixtures/simple_app.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse application definition: {0}")]
    AppParse(#[source] serde_json::Error),
    #[error("failed to parse submission: {0}")]
    SubmissionParse(#[source] serde_json::Error),
    #[error("stage '{0}' is not available")]
    StageUnavailable(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Job(#[from] JobError),
}

fn load_app(app_json: &str) -> Result<ApplicationSpec, ComponentError> {
    let raw = if app_json.trim().is_empty() {
        DEFAULT_APP
    } else {
        app_json
    };
    serde_json::from_str(raw).map_err(ComponentError::AppParse)
}

fn parse_object(raw: &str) -> Map<String, Value> {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default()
}

fn parse_templates(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// Application with its registration context declared.
struct Session {
    spec: ApplicationSpec,
    registration: Registration,
}

impl Session {
    fn open(app_json: &str) -> Result<Self, ComponentError> {
        let spec = load_app(app_json)?;
        let mut registration = Registration::new();
        spec.declare(&mut registration)?;
        Ok(Self { spec, registration })
    }

    fn ensure_stage(&self, stage: &str) -> Result<(), ComponentError> {
        if stage == MAIN_FLOW || self.registration.contains(stage) {
            Ok(())
        } else {
            Err(ComponentError::StageUnavailable(stage.to_string()))
        }
    }

    fn questions(&self, stage: &str, data: &Answers) -> Result<Vec<Question>, ComponentError> {
        let questions = if stage == MAIN_FLOW {
            self.spec.main_flow(data)?
        } else {
            self.registration.questions(stage, data)?
        };
        Ok(questions)
    }
}

pub fn describe(app_json: &str) -> String {
    respond(load_app(app_json).map(|spec| {
        let workflows: Vec<Value> = spec
            .workflows
            .iter()
            .map(|workflow| json!({ "name": workflow.name, "description": workflow.description }))
            .collect();
        let flows: Vec<&str> = spec.flows.iter().map(|flow| flow.name.as_str()).collect();
        json!({
            "id": spec.id,
            "title": spec.display_title(),
            "description": spec.description,
            "workflows": workflows,
            "flows": flows,
        })
    }))
}

/// Form for `stage`, after running its pre-hooks against the session data.
pub fn render_form(app_json: &str, stage: &str, data_json: &str, templates_json: &str) -> String {
    respond(Session::open(app_json).and_then(|session| {
        session.ensure_stage(stage)?;
        let mut data = parse_object(data_json);
        if stage == MAIN_FLOW {
            session
                .registration
                .apply_hook(GLOBAL_HOOK, Phase::Pre, &mut data)?;
        }
        session.registration.apply_hook(stage, Phase::Pre, &mut data)?;

        let questions = session.questions(stage, &data)?;
        let options = if stage == MAIN_FLOW {
            PageOptions {
                templates: parse_templates(templates_json),
                default_template: data
                    .get("default_template")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                workflows: session
                    .registration
                    .workflow_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            }
        } else {
            PageOptions::default()
        };
        debug!(stage, questions = questions.len(), "rendering form");
        let fields = build_page(&questions, &options);
        Ok(json!({
            "status": "need_input",
            "stage": stage,
            "form": form_json(&fields),
            "data": data,
        }))
    }))
}

/// Validate a submitted page, merge it into the session data and decide what comes next.
pub fn submit(app_json: &str, stage: &str, data_json: &str, submission_json: &str) -> String {
    respond(Session::open(app_json).and_then(|session| {
        session.ensure_stage(stage)?;
        let mut data = parse_object(data_json);
        let submission: Map<String, Value> =
            serde_json::from_str(submission_json).map_err(ComponentError::SubmissionParse)?;

        let questions = session.questions(stage, &data)?;
        let answers = match collect_submission(&questions, &submission) {
            Ok(answers) => answers,
            Err(errors) => {
                let errors = serde_json::to_value(errors).map_err(ComponentError::JsonEncode)?;
                return Ok(json!({
                    "status": "error",
                    "stage": stage,
                    "errors": errors,
                    "data": data,
                }));
            }
        };
        merge(&mut data, answers);

        let mut selected = None;
        if stage == MAIN_FLOW {
            if let Some(template) = non_empty(submission.get("template")) {
                data.insert("template".into(), Value::String(template));
            }
            // Without selectable workflows, `workflow` is an ordinary question answer.
            if session.registration.has_workflows() {
                selected = non_empty(submission.get(WORKFLOW_KEY));
            }
            if let Some(name) = &selected
                && !session.registration.is_selectable(name)
            {
                return Err(JobError::UnresolvedWorkflow { name: name.clone() }.into());
            }
        }
        session.registration.apply_hook(stage, Phase::Post, &mut data)?;

        let chained = non_empty(data.remove(NEXT_WORKFLOW_KEY).as_ref());
        if let Some(next) = selected.or(chained) {
            if !session.registration.contains(&next) {
                return Err(JobError::UnresolvedWorkflow { name: next }.into());
            }
            debug!(from = stage, to = %next, "next stage");
            return Ok(json!({
                "status": "need_input",
                "next_stage": next,
                "data": data,
            }));
        }

        session
            .registration
            .apply_hook(GLOBAL_HOOK, Phase::Post, &mut data)?;
        let template = select_template(None, &data);
        Ok(json!({
            "status": "complete",
            "template": template,
            "data": data,
        }))
    }))
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}
