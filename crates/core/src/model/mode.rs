use std::fmt;

use crate::model::ids::{QuestionId, TopicId};

/// How the learner asked for a session to be assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticeMode {
    /// Every eligible question of one topic.
    Topic(TopicId),
    /// Items the external scheduler reports as due.
    Review,
    /// Questions from topics where the learner is struggling.
    Weak,
    /// An explicit, hand-picked set of questions.
    Custom(Vec<QuestionId>),
}

impl PracticeMode {
    /// Adaptive modes go through the smart sampler; custom selections do not.
    #[must_use]
    pub fn is_adaptive(&self) -> bool {
        !matches!(self, PracticeMode::Custom(_))
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            PracticeMode::Topic(_) => "topic",
            PracticeMode::Review => "review",
            PracticeMode::Weak => "weak",
            PracticeMode::Custom(_) => "custom",
        }
    }
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeMode::Topic(topic) => write!(f, "topic:{topic}"),
            PracticeMode::Custom(ids) => write!(f, "custom:{}", ids.len()),
            other => f.write_str(other.label()),
        }
    }
}

/// Terminal "nothing to practice" state, one per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPool {
    NoTopicQuestions(TopicId),
    AllCaughtUp,
    NoWeakAreas,
    NoSelection,
}

impl EmptyPool {
    /// The empty state a mode lands in when its pool comes back empty.
    #[must_use]
    pub fn for_mode(mode: &PracticeMode) -> Self {
        match mode {
            PracticeMode::Topic(topic) => EmptyPool::NoTopicQuestions(*topic),
            PracticeMode::Review => EmptyPool::AllCaughtUp,
            PracticeMode::Weak => EmptyPool::NoWeakAreas,
            PracticeMode::Custom(_) => EmptyPool::NoSelection,
        }
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            EmptyPool::NoTopicQuestions(_) => "No questions for this topic yet.",
            EmptyPool::AllCaughtUp => "All caught up! Nothing is due for review.",
            EmptyPool::NoWeakAreas => "No weak areas found. Keep it up!",
            EmptyPool::NoSelection => "None of the selected questions are available.",
        }
    }
}

impl fmt::Display for EmptyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
