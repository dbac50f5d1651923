mod common;

use job_spec::spec::question::Question;
use job_spec::{
    ApplicationSpec, FieldKind, JobError, PageOptions, build_page, check, collect_submission,
    form_json,
};
use serde_json::json;

use common::{answers, app};

#[test]
fn fixtures_pass_definition_checks() {
    for name in ["simple_app", "harder_app"] {
        let report = check(&app(name));
        assert!(report.valid, "{name}: {:?}", report.issues);
    }
}

#[test]
fn boolean_list_without_branches_is_rejected() {
    let err = serde_json::from_value::<Question>(json!({
        "type": "boolean_list",
        "variablename": "gpus",
        "message": "Use GPUs?"
    }))
    .unwrap_err();
    assert!(err.to_string().contains("empty question lists"));

    let err = job_spec::spec::question::BooleanList::new("gpus", "Use GPUs?", vec![], vec![])
        .unwrap_err();
    assert!(matches!(err, JobError::Construction(_)));
}

#[test]
fn definitions_survive_a_serde_round_trip() {
    let spec = app("harder_app");
    let value = serde_json::to_value(&spec).expect("serialize");
    let again: ApplicationSpec = serde_json::from_value(value).expect("deserialize");
    assert_eq!(again, spec);
}

#[test]
fn main_page_offers_templates_and_workflows() {
    let spec = app("simple_app");
    let options = PageOptions {
        templates: vec!["job_template.hbs".into(), "other.hbs".into()],
        default_template: Some("other.hbs".into()),
        workflows: spec.workflows.iter().map(|workflow| workflow.name.clone()).collect(),
    };
    let fields = build_page(&spec.mainflow, &options);
    let names: Vec<_> = fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, ["template", "jobname", "memory", "workflow"]);
    assert!(matches!(fields[0].kind, FieldKind::Select { .. }));

    let value = form_json(&fields);
    assert_eq!(value["fields"][0]["default"], "other.hbs");
    assert_eq!(value["fields"][2]["type"], "integer");
    assert_eq!(value["fields"][2]["max"], 1000);
    assert_eq!(value["fields"][3]["choices"][2]["value"], "eigen");
}

#[test]
fn nested_submission_collapses_into_flat_answers() {
    let spec = app("harder_app");
    let submission = answers(json!({
        "jobname": "femfat-run",
        "memory": "64",
        "timelimit": "24",
        "workflow": "Debug session",
        "scratch": "/scratch/me",
        "ffjfile": "/data/in.ffj",
        "multi": ["ett", "fyra"],
        "gpus": "y",
        "gpus_trueform": {
            "gpu_count": "4",
            "mig": "on",
            "mig_trueform": { "mig_profile": "3g.20gb" }
        }
    }));
    let collected = collect_submission(&spec.mainflow, &submission).expect("valid submission");

    assert_eq!(collected["memory"], json!(64));
    assert_eq!(collected["timelimit"], json!(24));
    assert_eq!(collected["workflow"], json!("debug"));
    assert_eq!(collected["gpu_count"], json!(4));
    assert_eq!(collected["mig"], json!(true));
    assert_eq!(collected["mig_profile"], json!("3g.20gb"));
    assert_eq!(collected["exclusive"], json!(false));
    assert_eq!(collected["cores"], json!(4));
    assert_eq!(collected["partition"], json!("compute"));
    assert!(!collected.contains_key("gpus_trueform"));
}
