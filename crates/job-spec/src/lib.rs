#![allow(missing_docs)]

pub mod answers;
pub mod application;
pub mod driver;
pub mod error;
pub mod form;
pub mod prompt;
pub mod registry;
pub mod resolve;
pub mod spec;
pub mod template;
pub mod validate;

pub use answers::{
    AnswerFile, Answers, MAIN_FLOW, NEXT_WORKFLOW_KEY, SavedAnswers, WORKFLOW_KEY, merge,
    parse_prefill, truthy, value_to_display,
};
pub use application::Application;
pub use driver::{
    DEFAULT_CHAIN_LIMIT, RunOptions, RunOutcome, Stage, StageAnswers, Step, run,
};
pub use error::JobError;
pub use form::{
    FieldKind, FormChoice, FormField, PageOptions, build_form, build_page, collect_submission,
    form_json,
};
pub use prompt::{
    IgnoreWhen, PathKind, Prompt, PromptKind, ValidationError, check_answer, flatten,
    parse_flag,
};
pub use registry::{GLOBAL_HOOK, Hook, Phase, QuestionSource, Registration};
pub use resolve::{PromptError, Prompter, Resolution, ResolveOptions, resolve};
pub use spec::{ApplicationSpec, HookSpec, Question, WorkflowSpec};
pub use template::{FALLBACK_TEMPLATE, select_template};
pub use validate::{CheckIssue, CheckReport, check};
