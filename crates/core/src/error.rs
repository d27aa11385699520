use thiserror::Error;

use crate::model::{QuestionError, TestDefinitionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Definition(#[from] TestDefinitionError),
}
