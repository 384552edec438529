use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tutor_core::model::{
    AnswerSpec, AttemptId, AttemptRecord, FlagRecord, LearnerHistory, Question, QuestionError,
    QuestionId, TopicId,
};

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),
}

//
// ─── CANDIDATE QUERIES ─────────────────────────────────────────────────────────
//

/// Which eligible questions a candidate fetch should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateFilter {
    Topic(TopicId),
    Topics(Vec<TopicId>),
    Ids(Vec<QuestionId>),
}

/// One page of a candidate fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub filter: CandidateFilter,
    pub limit: usize,
    pub offset: usize,
}

impl CandidateQuery {
    #[must_use]
    pub fn first_page(filter: CandidateFilter, limit: usize) -> Self {
        Self {
            filter,
            limit,
            offset: 0,
        }
    }
}

/// Questions matching a query, plus how many match in total.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidatePage {
    pub questions: Vec<Question>,
    pub total: usize,
}

//
// ─── PERSISTED SHAPES ──────────────────────────────────────────────────────────
//

/// Serialized shape of a question, as kept in question banks.
///
/// Mirrors the domain `Question` so adapters can load and store questions
/// without leaking serialization concerns into the domain layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub topic_id: TopicId,
    pub prompt: String,
    #[serde(default)]
    pub prompt_markup: Option<String>,
    #[serde(flatten)]
    pub answer: AnswerSpec,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub solution_steps: Vec<String>,
}

fn default_difficulty() -> u8 {
    3
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id(),
            topic_id: question.topic_id(),
            prompt: question.prompt().to_owned(),
            prompt_markup: question.prompt_markup().map(str::to_owned),
            answer: question.answer().clone(),
            difficulty: question.difficulty(),
            hints: question.hints().to_vec(),
            solution_steps: question.solution_steps().to_vec(),
        }
    }

    /// Convert the record back into a domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the record fails domain validation.
    pub fn into_question(self) -> Result<Question, QuestionError> {
        let mut question = Question::new(
            self.id,
            self.topic_id,
            self.prompt,
            self.answer,
            self.difficulty,
        )?
        .with_hints(self.hints)
        .with_solution_steps(self.solution_steps);
        if let Some(markup) = self.prompt_markup {
            question = question.with_prompt_markup(markup);
        }
        Ok(question)
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Source of eligible practice questions.
///
/// Archived or inactive questions are filtered out by the store itself.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Fetch one page of candidates.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<CandidatePage, StorageError>;
}

/// External spaced-repetition scheduler.
#[async_trait]
pub trait ReviewQueue: Send + Sync {
    /// Questions whose next-due timestamp is at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the scheduler cannot be queried.
    async fn due_question_ids(&self, now: DateTime<Utc>) -> Result<Vec<QuestionId>, StorageError>;
}

/// Per-learner attempt history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Per-question and per-topic aggregates for the current learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the history cannot be loaded.
    async fn learner_history(&self) -> Result<LearnerHistory, StorageError>;
}

/// Receives submitted answers.
#[async_trait]
pub trait AttemptSink: Send + Sync {
    /// Record an attempt and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn record_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError>;
}

/// Moderation queue for disputed questions.
#[async_trait]
pub trait FlagSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be stored.
    async fn submit_flag(&self, record: &FlagRecord) -> Result<(), StorageError>;
}

/// Aggregates the external collaborators behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionStore>,
    pub reviews: Arc<dyn ReviewQueue>,
    pub history: Arc<dyn HistoryStore>,
    pub attempts: Arc<dyn AttemptSink>,
    pub flags: Arc<dyn FlagSink>,
}

impl Storage {
    /// Wire every collaborator to the same in-memory repository.
    #[must_use]
    pub fn from_memory(repo: &InMemoryRepository) -> Self {
        Self {
            questions: Arc::new(repo.clone()),
            reviews: Arc::new(repo.clone()),
            history: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            flags: Arc::new(repo.clone()),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(&InMemoryRepository::new())
    }

    #[must_use]
    pub fn with_attempt_sink(mut self, sink: Arc<dyn AttemptSink>) -> Self {
        self.attempts = sink;
        self
    }

    #[must_use]
    pub fn with_flag_sink(mut self, sink: Arc<dyn FlagSink>) -> Self {
        self.flags = sink;
        self
    }
}
