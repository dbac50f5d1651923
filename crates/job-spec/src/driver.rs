//! Workflow driver: runs one application from the global pre-hook through the
//! main flow, chained workflows and workflow selection to the global post-hook.

use serde_json::Value;
use tracing::{debug, info};

use crate::answers::{
    AnswerFile, Answers, MAIN_FLOW, NEXT_WORKFLOW_KEY, SavedAnswers, WORKFLOW_KEY, merge,
};
use crate::application::Application;
use crate::error::JobError;
use crate::registry::{GLOBAL_HOOK, Phase, Registration};
use crate::resolve::{Prompter, Resolution, ResolveOptions, resolve};
use crate::spec::question::{Choice, List, Question};
use crate::template::select_template;

/// Longest `nextworkflow` chain a run follows before giving up.
pub const DEFAULT_CHAIN_LIMIT: usize = 32;

/// Prompt text of the workflow selection question.
pub const SELECT_WORKFLOW_MESSAGE: &str = "What workflow should be used";

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Take defaults instead of prompting where a question has one.
    pub fast_forward: bool,
    /// Pre-filled answers, workflow pin and chain table.
    pub answer_file: AnswerFile,
    /// Static data merged into the answer map before anything runs.
    pub seed: Answers,
    /// Explicit template, overriding `template`/`default_template` answers.
    pub template: Option<String>,
    pub chain_limit: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fast_forward: false,
            answer_file: AnswerFile::default(),
            seed: Answers::new(),
            template: None,
            chain_limit: DEFAULT_CHAIN_LIMIT,
        }
    }
}

/// A question-asking stage of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    MainFlow,
    /// Reached through `nextworkflow` or the answer file's chain table.
    Chained(String),
    /// Picked at workflow selection.
    Selected(String),
}

impl Stage {
    /// Name hooks and chain tables use for this stage.
    pub fn name(&self) -> &str {
        match self {
            Stage::MainFlow => MAIN_FLOW,
            Stage::Chained(name) | Stage::Selected(name) => name,
        }
    }
}

/// One observable step of a run, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Hook { target: String, phase: Phase },
    Questions(Stage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageAnswers {
    pub stage: Stage,
    pub resolution: Resolution,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final answer map handed to the template renderer.
    pub answers: Answers,
    pub template: String,
    /// Replayable record of the run.
    pub saved: SavedAnswers,
    pub stages: Vec<StageAnswers>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    GlobalPre,
    MainFlow,
    Chain,
    Select,
    GlobalPost,
    Done,
}

/// Drive `app` to completion with a fresh registration context.
pub fn run<A, P>(app: &A, options: RunOptions, prompter: &mut P) -> Result<RunOutcome, JobError>
where
    A: Application + ?Sized,
    P: Prompter + ?Sized,
{
    let mut registration = Registration::new();
    app.declare(&mut registration)?;
    debug!(?registration, "application declared");

    let mut driver = Driver::new(app, registration, options, prompter);
    let mut state = State::GlobalPre;
    while state != State::Done {
        state = match state {
            State::GlobalPre => {
                driver.hook(GLOBAL_HOOK, Phase::Pre)?;
                State::MainFlow
            }
            State::MainFlow => {
                driver.stage(Stage::MainFlow)?;
                State::Chain
            }
            State::Chain => driver.chain_step()?,
            State::Select => {
                driver.select()?;
                State::GlobalPost
            }
            State::GlobalPost => {
                driver.hook(GLOBAL_HOOK, Phase::Post)?;
                State::Done
            }
            State::Done => State::Done,
        };
    }
    Ok(driver.finish())
}

struct Driver<'a, A: ?Sized, P: ?Sized> {
    app: &'a A,
    registration: Registration,
    options: RunOptions,
    prior: Answers,
    prompter: &'a mut P,
    answers: Answers,
    saved: SavedAnswers,
    stages: Vec<StageAnswers>,
    steps: Vec<Step>,
    current: String,
    chained: usize,
    consumed_selectable: bool,
}

impl<'a, A, P> Driver<'a, A, P>
where
    A: Application + ?Sized,
    P: Prompter + ?Sized,
{
    fn new(
        app: &'a A,
        registration: Registration,
        options: RunOptions,
        prompter: &'a mut P,
    ) -> Self {
        let prior = options.answer_file.prior_answers();
        let answers = options.seed.clone();
        Self {
            app,
            registration,
            options,
            prior,
            prompter,
            answers,
            saved: SavedAnswers::default(),
            stages: Vec::new(),
            steps: Vec::new(),
            current: MAIN_FLOW.to_string(),
            chained: 0,
            consumed_selectable: false,
        }
    }

    fn hook(&mut self, target: &str, phase: Phase) -> Result<(), JobError> {
        if self.registration.apply_hook(target, phase, &mut self.answers)? {
            self.steps.push(Step::Hook {
                target: target.to_string(),
                phase,
            });
        }
        Ok(())
    }

    fn stage(&mut self, stage: Stage) -> Result<(), JobError> {
        let name = stage.name().to_string();
        info!(stage = %name, "entering stage");
        self.hook(&name, Phase::Pre)?;

        let questions = match &stage {
            Stage::MainFlow => self.app.main_flow(&self.answers)?,
            Stage::Chained(_) | Stage::Selected(_) => {
                self.registration.questions(&name, &self.answers)?
            }
        };
        let options = ResolveOptions {
            fast_forward: self.options.fast_forward,
        };
        let resolution = resolve(
            &questions,
            &self.prior,
            &self.answers,
            options,
            &mut *self.prompter,
        )?;
        merge(&mut self.answers, resolution.answers.clone());
        self.saved.record(resolution.answers.clone());
        self.steps.push(Step::Questions(stage.clone()));
        self.stages.push(StageAnswers { stage, resolution });

        self.hook(&name, Phase::Post)
    }

    /// Follow one link of the chain, or move on to selection when none is pending.
    fn chain_step(&mut self) -> Result<State, JobError> {
        let Some(next) = self.next_chained()? else {
            return Ok(State::Select);
        };
        if self.chained >= self.options.chain_limit {
            return Err(JobError::ChainLimit {
                limit: self.options.chain_limit,
                last: next,
            });
        }
        if !self.registration.contains(&next) {
            return Err(JobError::UnresolvedWorkflow { name: next });
        }
        debug!(from = %self.current, to = %next, "chaining");
        self.chained += 1;
        self.consumed_selectable |= self.registration.is_selectable(&next);
        self.saved.chain.push(next.clone());
        self.current = next.clone();
        self.stage(Stage::Chained(next))?;
        Ok(State::Chain)
    }

    /// Next chained stage. A replayed chain is followed by position until it
    /// runs out, then `nextworkflow` decides.
    ///
    /// `nextworkflow` is consumed at every step, including replayed ones: the
    /// hooks that set it run again on replay, so consuming it keeps the answer
    /// map identical to the recorded run.
    fn next_chained(&mut self) -> Result<Option<String>, JobError> {
        let pending = self.answers.remove(NEXT_WORKFLOW_KEY);
        if let Some(next) = self.options.answer_file.chain.get(self.chained) {
            return Ok(Some(next.clone()));
        }
        match pending {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(name)) if name.is_empty() => Ok(None),
            Some(Value::String(name)) => Ok(Some(name)),
            Some(other) => Err(JobError::UnresolvedWorkflow {
                name: other.to_string(),
            }),
        }
    }

    fn select(&mut self) -> Result<(), JobError> {
        if !self.registration.has_workflows() {
            return Ok(());
        }
        if self.consumed_selectable {
            debug!("workflow consumed by chaining, skipping selection");
            self.registration.drain_workflows();
            return Ok(());
        }
        let name = match self.pinned_workflow() {
            Some(name) => name,
            None => self.prompt_workflow()?,
        };
        if !self.registration.is_selectable(&name) {
            return Err(JobError::UnresolvedWorkflow { name });
        }
        info!(workflow = %name, "workflow selected");
        self.saved.workflow = Some(name.clone());
        self.stage(Stage::Selected(name))?;
        self.registration.drain_workflows();
        Ok(())
    }

    /// Workflow chosen without prompting: the answer file's pin, or a main flow
    /// answer named `workflow` that matches a registered workflow.
    fn pinned_workflow(&self) -> Option<String> {
        if let Some(name) = &self.options.answer_file.workflow {
            return Some(name.clone());
        }
        match self.answers.get(WORKFLOW_KEY) {
            Some(Value::String(name)) if self.registration.is_selectable(name) => {
                Some(name.clone())
            }
            _ => None,
        }
    }

    fn prompt_workflow(&mut self) -> Result<String, JobError> {
        let choices: Vec<Choice> = self
            .registration
            .workflow_names()
            .into_iter()
            .map(|name| match self.registration.workflow_description(name) {
                Some(description) => Choice::labeled(format!("{name}: {description}"), name),
                None => Choice::plain(name),
            })
            .collect();
        let question: Question = List::new(WORKFLOW_KEY, SELECT_WORKFLOW_MESSAGE, choices).into();
        let resolution = resolve(
            std::slice::from_ref(&question),
            &Answers::new(),
            &self.answers,
            ResolveOptions::default(),
            &mut *self.prompter,
        )?;
        match resolution.answers.get(WORKFLOW_KEY) {
            Some(Value::String(name)) => Ok(name.clone()),
            other => Err(JobError::UnresolvedWorkflow {
                name: other.map(Value::to_string).unwrap_or_default(),
            }),
        }
    }

    fn finish(self) -> RunOutcome {
        let template = select_template(self.options.template.as_deref(), &self.answers);
        info!(template = %template, "run complete");
        RunOutcome {
            answers: self.answers,
            template,
            saved: self.saved,
            stages: self.stages,
            steps: self.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::prompt::Prompt;
    use crate::resolve::PromptError;
    use crate::spec::question::Text;
    use serde_json::json;

    struct Replies(VecDeque<Value>);

    impl Prompter for Replies {
        fn ask(&mut self, _prompt: &Prompt, _answers: &Answers) -> Result<Value, PromptError> {
            self.0.pop_front().ok_or(PromptError::Cancelled)
        }
    }

    struct Looping;

    impl Application for Looping {
        fn main_flow(&self, _answers: &Answers) -> Result<Vec<Question>, JobError> {
            Ok(vec![Text::new("nextworkflow", "Next").with_default("again").into()])
        }

        fn declare(&self, registration: &mut Registration) -> Result<(), JobError> {
            let mut again = Answers::new();
            again.insert(NEXT_WORKFLOW_KEY.into(), json!("again"));
            registration
                .flow("again", Vec::<Question>::new())
                .hook("again", Phase::Post, again);
            Ok(())
        }
    }

    #[test]
    fn self_chaining_stops_at_the_limit() {
        let options = RunOptions {
            fast_forward: true,
            chain_limit: 3,
            ..Default::default()
        };
        let err = run(&Looping, options, &mut Replies(VecDeque::new())).unwrap_err();
        assert!(matches!(err, JobError::ChainLimit { limit: 3, last } if last == "again"));
    }

    #[test]
    fn workflow_selection_prompts_with_registered_names() {
        struct Selecting;

        impl Application for Selecting {
            fn main_flow(&self, _answers: &Answers) -> Result<Vec<Question>, JobError> {
                Ok(Vec::new())
            }

            fn declare(&self, registration: &mut Registration) -> Result<(), JobError> {
                registration
                    .workflow("debug", vec![Question::from(Text::new("debugfile", "File"))])
                    .workflow("run", Vec::<Question>::new());
                Ok(())
            }
        }

        let mut replies = Replies(VecDeque::from([json!("debug"), json!("core.dump")]));
        let outcome = run(&Selecting, RunOptions::default(), &mut replies).unwrap();
        assert_eq!(outcome.saved.workflow.as_deref(), Some("debug"));
        assert_eq!(outcome.answers["debugfile"], json!("core.dump"));
        assert!(!outcome.answers.contains_key(WORKFLOW_KEY));
    }

    #[test]
    fn empty_nextworkflow_ends_the_chain() {
        struct Empty;

        impl Application for Empty {
            fn main_flow(&self, _answers: &Answers) -> Result<Vec<Question>, JobError> {
                Ok(vec![Text::new("nextworkflow", "Next").into()])
            }
        }

        let mut replies = Replies(VecDeque::from([json!("")]));
        let outcome = run(&Empty, RunOptions::default(), &mut replies).unwrap();
        assert_eq!(outcome.steps, [Step::Questions(Stage::MainFlow)]);
        assert!(!outcome.answers.contains_key(NEXT_WORKFLOW_KEY));
    }
}
