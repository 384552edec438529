use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tutor_core::Clock;
use tutor_core::model::{
    AttemptAggregate, AttemptId, AttemptRecord, FlagRecord, LearnerHistory, Question, QuestionId,
    TopicAccuracy,
};

use crate::repository::{
    AttemptSink, CandidateFilter, CandidatePage, CandidateQuery, FlagSink, HistoryStore,
    QuestionStore, ReviewQueue, StorageError,
};

#[derive(Debug, Default)]
struct State {
    questions: BTreeMap<QuestionId, Question>,
    archived: HashSet<QuestionId>,
    next_due: HashMap<QuestionId, DateTime<Utc>>,
    history: HashMap<QuestionId, AttemptAggregate>,
    attempts: Vec<(AttemptId, AttemptRecord)>,
    flags: Vec<FlagRecord>,
}

impl State {
    fn is_eligible(&self, id: QuestionId) -> bool {
        !self.archived.contains(&id)
    }
}

/// Simple in-memory repository implementing every external contract, for
/// testing and the terminal driver.
///
/// Recorded attempts are folded into the stored history, so the next call to
/// [`HistoryStore::learner_history`] reflects them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
    clock: Clock,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time source for `last_attempt_at` on recorded attempts.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Insert or replace a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the repository lock is poisoned.
    pub fn upsert_question(&self, question: Question) -> Result<(), StorageError> {
        self.lock()?.questions.insert(question.id(), question);
        Ok(())
    }

    /// Hide a question from candidate fetches.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown questions.
    pub fn archive_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.questions.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.archived.insert(id);
        Ok(())
    }

    /// Set when the external scheduler next wants a question reviewed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the repository lock is poisoned.
    pub fn set_next_due(&self, id: QuestionId, due: DateTime<Utc>) -> Result<(), StorageError> {
        self.lock()?.next_due.insert(id, due);
        Ok(())
    }

    /// Seed the attempt history for a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the repository lock is poisoned.
    pub fn set_history(
        &self,
        id: QuestionId,
        aggregate: AttemptAggregate,
    ) -> Result<(), StorageError> {
        self.lock()?.history.insert(id, aggregate);
        Ok(())
    }

    /// Attempts received so far, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the repository lock is poisoned.
    pub fn recorded_attempts(&self) -> Result<Vec<(AttemptId, AttemptRecord)>, StorageError> {
        Ok(self.lock()?.attempts.clone())
    }

    /// Flags received so far, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the repository lock is poisoned.
    pub fn recorded_flags(&self) -> Result<Vec<FlagRecord>, StorageError> {
        Ok(self.lock()?.flags.clone())
    }
}

#[async_trait]
impl QuestionStore for InMemoryRepository {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<CandidatePage, StorageError> {
        let guard = self.lock()?;
        let matching: Vec<&Question> = match &query.filter {
            CandidateFilter::Topic(topic) => guard
                .questions
                .values()
                .filter(|q| q.topic_id() == *topic)
                .collect(),
            CandidateFilter::Topics(topics) => guard
                .questions
                .values()
                .filter(|q| topics.contains(&q.topic_id()))
                .collect(),
            CandidateFilter::Ids(ids) => {
                let wanted: HashSet<_> = ids.iter().copied().collect();
                guard
                    .questions
                    .values()
                    .filter(|q| wanted.contains(&q.id()))
                    .collect()
            }
        };
        let eligible: Vec<&Question> = matching
            .into_iter()
            .filter(|q| guard.is_eligible(q.id()))
            .collect();

        Ok(CandidatePage {
            total: eligible.len(),
            questions: eligible
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl ReviewQueue for InMemoryRepository {
    async fn due_question_ids(&self, now: DateTime<Utc>) -> Result<Vec<QuestionId>, StorageError> {
        let guard = self.lock()?;
        let mut due: Vec<(DateTime<Utc>, QuestionId)> = guard
            .next_due
            .iter()
            .filter(|(id, at)| **at <= now && guard.is_eligible(**id))
            .map(|(id, at)| (*at, *id))
            .collect();
        due.sort();
        Ok(due.into_iter().map(|(_, id)| id).collect())
    }
}

#[async_trait]
impl HistoryStore for InMemoryRepository {
    async fn learner_history(&self) -> Result<LearnerHistory, StorageError> {
        let guard = self.lock()?;
        let mut topics: HashMap<_, TopicAccuracy> = HashMap::new();
        for (id, aggregate) in &guard.history {
            if let Some(question) = guard.questions.get(id) {
                topics
                    .entry(question.topic_id())
                    .or_default()
                    .absorb(aggregate);
            }
        }
        Ok(LearnerHistory {
            questions: guard.history.clone(),
            topics,
        })
    }
}

#[async_trait]
impl AttemptSink for InMemoryRepository {
    async fn record_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError> {
        let mut guard = self.lock()?;
        if !guard.questions.contains_key(&record.question_id) {
            return Err(StorageError::NotFound);
        }
        let id = AttemptId::new(guard.attempts.len() as u64 + 1);
        guard
            .history
            .entry(record.question_id)
            .or_default()
            .record(record.is_correct, self.clock.now());
        guard.attempts.push((id, record.clone()));
        Ok(id)
    }
}

#[async_trait]
impl FlagSink for InMemoryRepository {
    async fn submit_flag(&self, record: &FlagRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.questions.contains_key(&record.question_id) {
            return Err(StorageError::NotFound);
        }
        guard.flags.push(record.clone());
        Ok(())
    }
}
