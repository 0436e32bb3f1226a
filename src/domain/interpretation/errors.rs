//! Interpretation Context - Errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretationError {
    /// missingInfo 与 followUpQuestions 无法一一对应
    #[error(
        "malformed interpretation: {missing_info} missing keys but {follow_up_questions} follow-up questions"
    )]
    Malformed {
        missing_info: usize,
        follow_up_questions: usize,
    },

    #[error("malformed interpretation: missing key at position {0} is blank")]
    BlankKey(usize),
}
