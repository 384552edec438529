use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

use storage::{CandidateFilter, CandidateQuery, QuestionStore, ReviewQueue, StorageError};
use tutor_core::model::{EmptyPool, PracticeMode, PracticeSettings, Question, QuestionId};

use super::history::HistoryIndex;

/// Candidates for a session, before sampling.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedPool {
    /// Goes through the smart sampler.
    Adaptive(Vec<Question>),
    /// Hand-picked set: shuffled as-is, never sampled down.
    Manual(Vec<Question>),
    Empty(EmptyPool),
}

/// Turns a practice mode into the list of eligible questions.
pub struct CandidatePoolResolver<'a> {
    questions: &'a dyn QuestionStore,
    reviews: &'a dyn ReviewQueue,
    settings: &'a PracticeSettings,
}

impl<'a> CandidatePoolResolver<'a> {
    #[must_use]
    pub fn new(
        questions: &'a dyn QuestionStore,
        reviews: &'a dyn ReviewQueue,
        settings: &'a PracticeSettings,
    ) -> Self {
        Self {
            questions,
            reviews,
            settings,
        }
    }

    /// Resolve the candidate pool for `mode`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the question store or review queue fails.
    pub async fn resolve(
        &self,
        mode: &PracticeMode,
        history: &HistoryIndex,
        now: DateTime<Utc>,
    ) -> Result<ResolvedPool, StorageError> {
        let filter = match mode {
            PracticeMode::Topic(topic) => CandidateFilter::Topic(*topic),
            PracticeMode::Review => {
                let due = self.reviews.due_question_ids(now).await?;
                debug!(due = due.len(), "review queue answered");
                if due.is_empty() {
                    return Ok(ResolvedPool::Empty(EmptyPool::AllCaughtUp));
                }
                CandidateFilter::Ids(due)
            }
            PracticeMode::Weak => {
                let weak = history.weak_topics(
                    self.settings.weak_min_attempts(),
                    self.settings.weak_accuracy_threshold(),
                );
                debug!(weak_topics = weak.len(), "weak topics computed");
                if weak.is_empty() {
                    return Ok(ResolvedPool::Empty(EmptyPool::NoWeakAreas));
                }
                CandidateFilter::Topics(weak)
            }
            PracticeMode::Custom(ids) => {
                let ids = dedup_ids(ids);
                if ids.is_empty() {
                    return Ok(ResolvedPool::Empty(EmptyPool::NoSelection));
                }
                CandidateFilter::Ids(ids)
            }
        };

        let questions = self.fetch_all(filter).await?;
        debug!(mode = %mode, candidates = questions.len(), "candidate pool resolved");

        Ok(if questions.is_empty() {
            ResolvedPool::Empty(EmptyPool::for_mode(mode))
        } else if mode.is_adaptive() {
            ResolvedPool::Adaptive(questions)
        } else {
            ResolvedPool::Manual(questions)
        })
    }

    /// Pages through the store until every matching question is loaded.
    async fn fetch_all(&self, filter: CandidateFilter) -> Result<Vec<Question>, StorageError> {
        let mut query = CandidateQuery::first_page(filter, self.settings.fetch_page_size());
        let mut seen = HashSet::new();
        let mut questions = Vec::new();

        loop {
            let page = self.questions.fetch_candidates(&query).await?;
            let fetched = page.questions.len();
            questions.extend(page.questions.into_iter().filter(|q| seen.insert(q.id())));
            query.offset += fetched;
            if fetched == 0 || query.offset >= page.total {
                break;
            }
        }

        Ok(questions)
    }
}

fn dedup_ids(ids: &[QuestionId]) -> Vec<QuestionId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{HistoryStore, InMemoryRepository};
    use tutor_core::model::{AnswerSpec, AttemptAggregate, TopicId};
    use tutor_core::time::fixed_now;

    fn question(id: u64, topic: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            TopicId::new(topic),
            format!("Q{id}"),
            AnswerSpec::exact("a"),
            1,
        )
        .unwrap()
    }

    fn repo() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for id in 1..=7 {
            repo.upsert_question(question(id, 1)).unwrap();
        }
        for id in 8..=10 {
            repo.upsert_question(question(id, 2)).unwrap();
        }
        repo
    }

    fn small_pages() -> PracticeSettings {
        PracticeSettings::new(20, 0.7, 3.0, 2.5, 3, 0.6, 0.001, 3).unwrap()
    }

    async fn index(repo: &InMemoryRepository) -> HistoryIndex {
        HistoryIndex::build(repo.learner_history().await.unwrap())
    }

    #[tokio::test]
    async fn topic_mode_pages_through_every_question() {
        let repo = repo();
        let settings = small_pages();
        let resolver = CandidatePoolResolver::new(&repo, &repo, &settings);

        let pool = resolver
            .resolve(&PracticeMode::Topic(TopicId::new(1)), &index(&repo).await, fixed_now())
            .await
            .unwrap();
        let ResolvedPool::Adaptive(questions) = pool else {
            panic!("expected adaptive pool");
        };
        assert_eq!(questions.len(), 7);
    }

    #[tokio::test]
    async fn topic_without_questions_is_distinct_empty_state() {
        let repo = repo();
        let settings = PracticeSettings::default();
        let resolver = CandidatePoolResolver::new(&repo, &repo, &settings);

        let pool = resolver
            .resolve(&PracticeMode::Topic(TopicId::new(42)), &index(&repo).await, fixed_now())
            .await
            .unwrap();
        assert_eq!(
            pool,
            ResolvedPool::Empty(EmptyPool::NoTopicQuestions(TopicId::new(42)))
        );
    }

    #[tokio::test]
    async fn review_mode_forwards_due_ids() {
        let repo = repo();
        let now = fixed_now();
        repo.set_next_due(QuestionId::new(3), now).unwrap();
        repo.set_next_due(QuestionId::new(9), now - chrono::Duration::hours(2))
            .unwrap();
        repo.set_next_due(QuestionId::new(4), now + chrono::Duration::hours(2))
            .unwrap();
        let settings = PracticeSettings::default();
        let resolver = CandidatePoolResolver::new(&repo, &repo, &settings);

        let pool = resolver
            .resolve(&PracticeMode::Review, &index(&repo).await, now)
            .await
            .unwrap();
        let ResolvedPool::Adaptive(questions) = pool else {
            panic!("expected adaptive pool");
        };
        let mut ids: Vec<_> = questions.iter().map(Question::id).collect();
        ids.sort();
        assert_eq!(ids, vec![QuestionId::new(3), QuestionId::new(9)]);
    }

    #[tokio::test]
    async fn review_mode_with_nothing_due_is_all_caught_up() {
        let repo = repo();
        let settings = PracticeSettings::default();
        let resolver = CandidatePoolResolver::new(&repo, &repo, &settings);

        let pool = resolver
            .resolve(&PracticeMode::Review, &index(&repo).await, fixed_now())
            .await
            .unwrap();
        assert_eq!(pool, ResolvedPool::Empty(EmptyPool::AllCaughtUp));
    }

    #[tokio::test]
    async fn weak_mode_pulls_questions_from_weak_topics() {
        let repo = repo();
        // Topic 2: 4 attempts, 1 correct => weak. Topic 1: 2 attempts => too few.
        repo.set_history(QuestionId::new(8), AttemptAggregate::new(4, 1, None))
            .unwrap();
        repo.set_history(QuestionId::new(1), AttemptAggregate::new(2, 0, None))
            .unwrap();
        let settings = PracticeSettings::default();
        let resolver = CandidatePoolResolver::new(&repo, &repo, &settings);

        let pool = resolver
            .resolve(&PracticeMode::Weak, &index(&repo).await, fixed_now())
            .await
            .unwrap();
        let ResolvedPool::Adaptive(questions) = pool else {
            panic!("expected adaptive pool");
        };
        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|q| q.topic_id() == TopicId::new(2)));
    }

    #[tokio::test]
    async fn weak_mode_without_weak_topics_is_empty() {
        let repo = repo();
        repo.set_history(QuestionId::new(8), AttemptAggregate::new(5, 5, None))
            .unwrap();
        let settings = PracticeSettings::default();
        let resolver = CandidatePoolResolver::new(&repo, &repo, &settings);

        let pool = resolver
            .resolve(&PracticeMode::Weak, &index(&repo).await, fixed_now())
            .await
            .unwrap();
        assert_eq!(pool, ResolvedPool::Empty(EmptyPool::NoWeakAreas));
    }

    #[tokio::test]
    async fn custom_mode_is_manual_and_deduplicated() {
        let repo = repo();
        repo.archive_question(QuestionId::new(5)).unwrap();
        let settings = small_pages();
        let resolver = CandidatePoolResolver::new(&repo, &repo, &settings);
        let ids = [2, 5, 9, 2, 10].map(QuestionId::new).to_vec();

        let pool = resolver
            .resolve(&PracticeMode::Custom(ids), &HistoryIndex::default(), fixed_now())
            .await
            .unwrap();
        let ResolvedPool::Manual(questions) = pool else {
            panic!("expected manual pool");
        };
        let mut ids: Vec<_> = questions.iter().map(Question::id).collect();
        ids.sort();
        assert_eq!(ids, [2, 9, 10].map(QuestionId::new).to_vec());
    }

    #[tokio::test]
    async fn custom_mode_with_no_selection_is_empty() {
        let repo = repo();
        let settings = PracticeSettings::default();
        let resolver = CandidatePoolResolver::new(&repo, &repo, &settings);

        let pool = resolver
            .resolve(&PracticeMode::Custom(Vec::new()), &HistoryIndex::default(), fixed_now())
            .await
            .unwrap();
        assert_eq!(pool, ResolvedPool::Empty(EmptyPool::NoSelection));
    }
}
