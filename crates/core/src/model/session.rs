use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("correct answers ({correct}) exceed total answers ({total})")]
    CountMismatch { total: u32, correct: u32 },

    #[error("best streak ({streak}) exceeds correct answers ({correct})")]
    StreakMismatch { streak: u32, correct: u32 },
}

/// Aggregate summary for a finished practice session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total: u32,
    correct: u32,
    best_streak: u32,
}

impl SessionSummary {
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if timestamps are reversed or the counters
    /// are inconsistent with each other.
    pub fn new(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total: u32,
        correct: u32,
        best_streak: u32,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        if correct > total {
            return Err(SessionSummaryError::CountMismatch { total, correct });
        }
        if best_streak > correct {
            return Err(SessionSummaryError::StreakMismatch {
                streak: best_streak,
                correct,
            });
        }

        Ok(Self {
            started_at,
            completed_at,
            total,
            correct,
            best_streak,
        })
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    /// Percentage of correct answers, rounded down; 0 for an empty session.
    #[must_use]
    pub fn score_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let percent = u64::from(self.correct) * 100 / u64::from(self.total);
        u32::try_from(percent).unwrap_or(100)
    }
}
