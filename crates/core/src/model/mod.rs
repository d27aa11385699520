mod answer;
mod answer_sheet;
mod ids;
mod question;
mod test_def;

pub use answer::AnswerState;
pub use answer_sheet::AnswerSheet;
pub use ids::{ParseIdError, QuestionId, TestId};
pub use question::{AnswerOption, OptionLabel, Question, QuestionError};
pub use test_def::{TestDefinition, TestDefinitionError};
