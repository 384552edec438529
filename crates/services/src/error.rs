//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;
use tutor_core::model::{QuestionId, SessionSummaryError};

use crate::sessions::SessionPhase;

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("question {0} appears twice in the session list")]
    DuplicateQuestion(QuestionId),
    #[error("session already completed")]
    Completed,
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },
    #[error("an answer is required before submitting")]
    EmptyAnswer,
    #[error("choice {index} is out of range for {len} choices")]
    InvalidChoice { index: usize, len: usize },
    #[error("all hints have already been revealed")]
    HintsExhausted,
    #[error("this question has already been flagged")]
    AlreadyFlagged,
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
