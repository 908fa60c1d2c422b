pub mod attempt;
pub mod student;
pub mod test_definition;

pub use attempt::{AnswerRecord, Attempt, AttemptState, QuestionDeadline};
pub use student::StudentContext;
pub use test_definition::{AnswerOption, TestDefinition, TestQuestion};
