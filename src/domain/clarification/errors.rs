//! Clarification Context - Errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClarificationError {
    #[error("no clarification question is open (state: {0})")]
    NotAsking(&'static str),

    #[error("answer cannot be empty")]
    EmptyAnswer,

    #[error("no answer recorded for '{0}'")]
    AnswerMissing(String),

    #[error("clarification is not submitting (state: {0})")]
    NotSubmitting(&'static str),
}
