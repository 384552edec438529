use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::model::ids::{AttemptId, QuestionId, TopicId};

//
// ─── AGGREGATES ────────────────────────────────────────────────────────────────
//

/// Per-question attempt summary for the current learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttemptAggregate {
    pub attempts: u32,
    pub correct: u32,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl AttemptAggregate {
    #[must_use]
    pub fn new(attempts: u32, correct: u32, last_attempt_at: Option<DateTime<Utc>>) -> Self {
        Self {
            attempts,
            correct,
            last_attempt_at,
        }
    }

    /// No recorded attempts yet.
    #[must_use]
    pub fn is_unanswered(&self) -> bool {
        self.attempts == 0
    }

    /// Share of correct attempts in `[0, 1]`; `0.0` when unanswered.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        (f64::from(self.correct) / f64::from(self.attempts)).clamp(0.0, 1.0)
    }

    /// Folds one more attempt into the aggregate.
    pub fn record(&mut self, is_correct: bool, at: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
        self.last_attempt_at = Some(at);
    }
}

/// Per-topic accuracy used to find weak areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicAccuracy {
    pub attempts: u32,
    pub correct: u32,
}

impl TopicAccuracy {
    #[must_use]
    pub fn new(attempts: u32, correct: u32) -> Self {
        Self { attempts, correct }
    }

    /// A topic is weak once it has enough attempts and accuracy below `threshold`.
    #[must_use]
    pub fn is_weak(&self, min_attempts: u32, threshold: f64) -> bool {
        if self.attempts < min_attempts || self.attempts == 0 {
            return false;
        }
        f64::from(self.correct) / f64::from(self.attempts) < threshold
    }

    pub fn absorb(&mut self, aggregate: &AttemptAggregate) {
        self.attempts = self.attempts.saturating_add(aggregate.attempts);
        self.correct = self.correct.saturating_add(aggregate.correct);
    }
}

/// Bulk history feed for one learner, as returned by the history store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerHistory {
    #[serde(default)]
    pub questions: HashMap<QuestionId, AttemptAggregate>,
    #[serde(default)]
    pub topics: HashMap<TopicId, TopicAccuracy>,
}

//
// ─── OUTBOUND RECORDS ──────────────────────────────────────────────────────────
//

/// One submitted answer, sent to the attempt sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub question_id: QuestionId,
    pub answer_raw: String,
    pub is_correct: bool,
    pub time_spent_seconds: u64,
    pub hints_used: u32,
}

/// Why a learner disputes a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    IncorrectAnswer,
    Unclear,
    Typo,
    TooHard,
    MultipleValid,
    ClaimCorrect,
    Other,
}

impl FlagType {
    pub const ALL: [FlagType; 7] = [
        FlagType::IncorrectAnswer,
        FlagType::Unclear,
        FlagType::Typo,
        FlagType::TooHard,
        FlagType::MultipleValid,
        FlagType::ClaimCorrect,
        FlagType::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FlagType::IncorrectAnswer => "incorrect_answer",
            FlagType::Unclear => "unclear",
            FlagType::Typo => "typo",
            FlagType::TooHard => "too_hard",
            FlagType::MultipleValid => "multiple_valid",
            FlagType::ClaimCorrect => "claim_correct",
            FlagType::Other => "other",
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a flag type name is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown flag type: {0}")]
pub struct ParseFlagTypeError(String);

impl FromStr for FlagType {
    type Err = ParseFlagTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FlagType::ALL
            .into_iter()
            .find(|flag| flag.as_str() == wanted)
            .ok_or_else(|| ParseFlagTypeError(s.to_owned()))
    }
}

/// A disputed-answer report, sent to the moderation queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub question_id: QuestionId,
    pub flag_type: FlagType,
    pub comment: Option<String>,
    pub student_answer: Option<String>,
    pub attempt_id: Option<AttemptId>,
}
