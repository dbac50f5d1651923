pub mod application;
pub mod question;

pub use application::{ApplicationSpec, HookSpec, WorkflowSpec};
pub use question::{
    BooleanList, Checkbox, Choice, Confirm, Const, Directory, File, Integer, List, Question, Text,
};
