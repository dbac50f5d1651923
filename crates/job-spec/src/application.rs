use crate::answers::Answers;
use crate::error::JobError;
use crate::registry::Registration;
use crate::spec::application::ApplicationSpec;
use crate::spec::question::Question;

/// An application bundle: a main flow plus the workflows and hooks it declares.
pub trait Application {
    /// Questions asked unconditionally at the start of every run.
    fn main_flow(&self, answers: &Answers) -> Result<Vec<Question>, JobError>;

    /// Populate the run's registration context with workflows, flows and hooks.
    fn declare(&self, _registration: &mut Registration) -> Result<(), JobError> {
        Ok(())
    }
}

impl Application for ApplicationSpec {
    fn main_flow(&self, _answers: &Answers) -> Result<Vec<Question>, JobError> {
        Ok(self.mainflow.clone())
    }

    fn declare(&self, registration: &mut Registration) -> Result<(), JobError> {
        for workflow in &self.workflows {
            registration.workflow_described(
                workflow.name.clone(),
                workflow.description.clone(),
                workflow.questions.clone(),
            );
        }
        for flow in &self.flows {
            registration.flow(flow.name.clone(), flow.questions.clone());
        }
        for hook in &self.hooks {
            registration.hook(hook.workflow.clone(), hook.phase, hook.set.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{GLOBAL_HOOK, Phase};
    use serde_json::json;

    #[test]
    fn declarative_spec_registers_everything() {
        let spec: ApplicationSpec = serde_json::from_value(json!({
            "id": "femfat",
            "mainflow": [{ "type": "text", "variablename": "jobname", "message": "Job name" }],
            "workflows": [{ "name": "debug", "description": "Debug session", "questions": [] }],
            "flows": [{ "name": "cleanup", "questions": [] }],
            "hooks": [{ "phase": "post", "set": { "done": true } }]
        }))
        .expect("deserialize");
        let mut registration = Registration::new();
        spec.declare(&mut registration).unwrap();

        assert_eq!(registration.workflow_names(), ["debug"]);
        assert_eq!(registration.workflow_description("debug"), Some("Debug session"));
        assert!(registration.contains("cleanup"));
        assert!(registration.has_hook(GLOBAL_HOOK, Phase::Post));
        assert_eq!(spec.main_flow(&Answers::new()).unwrap().len(), 1);
    }
}
