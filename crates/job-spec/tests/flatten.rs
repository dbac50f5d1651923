mod common;

use job_spec::{PromptKind, flatten};

use common::app;

#[test]
fn nested_boolean_lists_flatten_in_document_order() {
    let spec = app("harder_app");
    let prompts = flatten(&spec.mainflow);
    let names: Vec<_> = prompts.iter().map(|prompt| prompt.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "jobname",
            "memory",
            "timelimit",
            "workflow",
            "scratch",
            "ffjfile",
            "multi",
            "gpus",
            "cores",
            "gpu_count",
            "mig",
            "exclusive",
            "mig_profile",
            "partition",
        ]
    );
}

#[test]
fn nested_prompts_carry_every_ancestor_gate() {
    let spec = app("harder_app");
    let prompts = flatten(&spec.mainflow);
    let find = |name: &str| {
        prompts
            .iter()
            .find(|prompt| prompt.name == name)
            .expect("prompt present")
    };

    assert_eq!(find("cores").ignore_when.len(), 1);
    assert!(find("cores").ignore_when[0].answered);

    let exclusive = find("exclusive");
    assert_eq!(exclusive.ignore_when.len(), 2);
    assert_eq!(exclusive.ignore_when[0].variable, "gpus");
    assert!(!exclusive.ignore_when[0].answered);
    assert_eq!(exclusive.ignore_when[1].variable, "mig");
    assert!(exclusive.ignore_when[1].answered);

    let profile = find("mig_profile");
    assert!(!profile.ignore_when[1].answered);
    assert!(matches!(profile.kind, PromptKind::List { .. }));
    assert!(matches!(find("partition").kind, PromptKind::Hidden));
}

#[test]
fn nested_gates_follow_the_answers() {
    let spec = app("harder_app");
    let prompts = flatten(&spec.mainflow);
    let find = |name: &str| {
        prompts
            .iter()
            .find(|prompt| prompt.name == name)
            .expect("prompt present")
    };
    let data = common::answers(serde_json::json!({ "gpus": true, "mig": false }));
    assert!(find("cores").is_ignored(&data));
    assert!(!find("gpu_count").is_ignored(&data));
    assert!(!find("exclusive").is_ignored(&data));
    assert!(find("mig_profile").is_ignored(&data));

    let data = common::answers(serde_json::json!({ "gpus": false, "mig": true }));
    assert!(find("mig_profile").is_ignored(&data));
    assert!(!find("cores").is_ignored(&data));
}
