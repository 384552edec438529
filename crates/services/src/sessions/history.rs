use std::collections::HashMap;

use tutor_core::model::{AttemptAggregate, LearnerHistory, QuestionId, TopicAccuracy, TopicId};

/// Lookup of the learner's past attempts, built once per session start.
///
/// The index is a snapshot: attempts made during the session do not change it.
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    questions: HashMap<QuestionId, AttemptAggregate>,
    topics: HashMap<TopicId, TopicAccuracy>,
}

impl HistoryIndex {
    #[must_use]
    pub fn build(history: LearnerHistory) -> Self {
        Self {
            questions: history.questions,
            topics: history.topics,
        }
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&AttemptAggregate> {
        self.questions.get(&id)
    }

    /// Absent and zero-attempt entries are both unanswered.
    #[must_use]
    pub fn is_unanswered(&self, id: QuestionId) -> bool {
        self.get(id).is_none_or(AttemptAggregate::is_unanswered)
    }

    /// Historical accuracy, or `None` for unanswered questions.
    #[must_use]
    pub fn accuracy(&self, id: QuestionId) -> Option<f64> {
        self.get(id)
            .filter(|agg| !agg.is_unanswered())
            .map(AttemptAggregate::accuracy)
    }

    /// Topics with at least `min_attempts` attempts and accuracy below
    /// `threshold`, in ascending id order.
    #[must_use]
    pub fn weak_topics(&self, min_attempts: u32, threshold: f64) -> Vec<TopicId> {
        let mut weak: Vec<TopicId> = self
            .topics
            .iter()
            .filter(|(_, accuracy)| accuracy.is_weak(min_attempts, threshold))
            .map(|(topic, _)| *topic)
            .collect();
        weak.sort();
        weak
    }
}
