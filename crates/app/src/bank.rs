use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use storage::{InMemoryRepository, QuestionRecord};
use tutor_core::Clock;
use tutor_core::model::{AttemptAggregate, Question, QuestionId};

/// JSON question bank: the questions plus optional review schedule and history.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionBank {
    pub questions: Vec<QuestionRecord>,
    #[serde(default)]
    pub due: Vec<DueEntry>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DueEntry {
    pub question_id: QuestionId,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub question_id: QuestionId,
    #[serde(flatten)]
    pub aggregate: AttemptAggregate,
}

impl QuestionBank {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read question bank {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid question bank {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Validated questions, in file order.
    pub fn questions(&self) -> Result<Vec<Question>, tutor_core::Error> {
        self.questions
            .iter()
            .cloned()
            .map(|record| record.into_question().map_err(tutor_core::Error::from))
            .collect()
    }

    /// Load everything into a fresh in-memory repository stamped by `clock`.
    pub fn into_repository(self, clock: Clock) -> anyhow::Result<InMemoryRepository> {
        let questions = self.questions()?;
        let mut seen = HashSet::new();
        if let Some(dup) = questions.iter().map(Question::id).find(|id| !seen.insert(*id)) {
            anyhow::bail!("question {dup} is defined more than once");
        }

        let repo = InMemoryRepository::new().with_clock(clock);
        for question in questions {
            repo.upsert_question(question)?;
        }
        for entry in &self.due {
            anyhow::ensure!(
                seen.contains(&entry.question_id),
                "due entry references unknown question {}",
                entry.question_id
            );
            repo.set_next_due(entry.question_id, entry.due_at)?;
        }
        for entry in &self.history {
            anyhow::ensure!(
                seen.contains(&entry.question_id),
                "history entry references unknown question {}",
                entry.question_id
            );
            repo.set_history(entry.question_id, entry.aggregate)?;
        }
        Ok(repo)
    }
}
