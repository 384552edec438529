use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{QuestionId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("difficulty must be between 1 and 5, got {0}")]
    InvalidDifficulty(u8),

    #[error("multiple choice question needs at least one choice")]
    NoChoices,

    #[error("correct choice index {index} is out of range for {len} choices")]
    ChoiceOutOfRange { index: usize, len: usize },

    #[error("numeric answer must be a finite number")]
    NonFiniteValue,

    #[error("numeric tolerance must be finite and >= 0")]
    InvalidTolerance,
}

//
// ─── ANSWER TYPE ───────────────────────────────────────────────────────────────
//

/// Tag naming how a question's answer is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Exact,
    Expression,
    Numeric,
    MultipleChoice,
    TrueFalse,
}

impl AnswerType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerType::Exact => "exact",
            AnswerType::Expression => "expression",
            AnswerType::Numeric => "numeric",
            AnswerType::MultipleChoice => "multiple_choice",
            AnswerType::TrueFalse => "true_false",
        }
    }
}

impl fmt::Display for AnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── TRUTH VALUE ───────────────────────────────────────────────────────────────
//

/// Stored value of a true/false question.
///
/// Question banks carry this as a JSON boolean, the string `"true"`, or `1`/`0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TruthValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl TruthValue {
    /// Boolean the learner's `true`/`false` is compared against.
    ///
    /// Only `true`, `"true"` and `1` count as true.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            TruthValue::Bool(value) => *value,
            TruthValue::Number(value) => (*value - 1.0).abs() < f64::EPSILON,
            TruthValue::Text(value) => value == "true",
        }
    }
}

impl From<bool> for TruthValue {
    fn from(value: bool) -> Self {
        TruthValue::Bool(value)
    }
}

//
// ─── ANSWER SPEC ───────────────────────────────────────────────────────────────
//

/// What counts as a correct answer, one variant per answer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "answer_type", rename_all = "snake_case")]
pub enum AnswerSpec {
    Exact {
        value: String,
        #[serde(default)]
        alternates: Vec<String>,
    },
    Expression {
        value: String,
        #[serde(default)]
        alternates: Vec<String>,
    },
    Numeric {
        value: f64,
        #[serde(default)]
        tolerance: Option<f64>,
        #[serde(default)]
        unit: Option<String>,
    },
    MultipleChoice {
        choices: Vec<String>,
        correct_index: usize,
    },
    TrueFalse {
        value: TruthValue,
    },
}

impl AnswerSpec {
    #[must_use]
    pub fn exact(value: impl Into<String>) -> Self {
        AnswerSpec::Exact {
            value: value.into(),
            alternates: Vec::new(),
        }
    }

    #[must_use]
    pub fn expression<I, S>(value: impl Into<String>, alternates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerSpec::Expression {
            value: value.into(),
            alternates: alternates.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn numeric(value: f64, tolerance: Option<f64>) -> Self {
        AnswerSpec::Numeric {
            value,
            tolerance,
            unit: None,
        }
    }

    #[must_use]
    pub fn multiple_choice<I, S>(choices: I, correct_index: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerSpec::MultipleChoice {
            choices: choices.into_iter().map(Into::into).collect(),
            correct_index,
        }
    }

    #[must_use]
    pub fn true_false(value: impl Into<TruthValue>) -> Self {
        AnswerSpec::TrueFalse {
            value: value.into(),
        }
    }

    #[must_use]
    pub fn answer_type(&self) -> AnswerType {
        match self {
            AnswerSpec::Exact { .. } => AnswerType::Exact,
            AnswerSpec::Expression { .. } => AnswerType::Expression,
            AnswerSpec::Numeric { .. } => AnswerType::Numeric,
            AnswerSpec::MultipleChoice { .. } => AnswerType::MultipleChoice,
            AnswerSpec::TrueFalse { .. } => AnswerType::TrueFalse,
        }
    }

    /// Choices for multiple-choice questions, empty otherwise.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        match self {
            AnswerSpec::MultipleChoice { choices, .. } => choices,
            _ => &[],
        }
    }

    /// Checks structural constraints that would make the answer uncheckable.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for empty choice lists, out-of-range choice
    /// indices, and non-finite numeric values or tolerances.
    pub fn check(&self) -> Result<(), QuestionError> {
        match self {
            AnswerSpec::MultipleChoice {
                choices,
                correct_index,
            } => {
                if choices.is_empty() {
                    return Err(QuestionError::NoChoices);
                }
                if *correct_index >= choices.len() {
                    return Err(QuestionError::ChoiceOutOfRange {
                        index: *correct_index,
                        len: choices.len(),
                    });
                }
                Ok(())
            }
            AnswerSpec::Numeric {
                value, tolerance, ..
            } => {
                if !value.is_finite() {
                    return Err(QuestionError::NonFiniteValue);
                }
                match tolerance {
                    Some(tolerance) if !tolerance.is_finite() || *tolerance < 0.0 => {
                        Err(QuestionError::InvalidTolerance)
                    }
                    _ => Ok(()),
                }
            }
            AnswerSpec::Exact { .. } | AnswerSpec::Expression { .. } | AnswerSpec::TrueFalse { .. } => {
                Ok(())
            }
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One practice item as handed out by the question store.
///
/// Questions are immutable once built; a session holds them by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    topic_id: TopicId,
    prompt: String,
    prompt_markup: Option<String>,
    answer: AnswerSpec,
    difficulty: u8,
    hints: Vec<String>,
    solution_steps: Vec<String>,
}

impl Question {
    /// Creates a question with no hints or solution steps.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` for a blank prompt,
    /// `QuestionError::InvalidDifficulty` outside 1–5, and any error from
    /// [`AnswerSpec::check`].
    pub fn new(
        id: QuestionId,
        topic_id: TopicId,
        prompt: impl Into<String>,
        answer: AnswerSpec,
        difficulty: u8,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if !(1..=5).contains(&difficulty) {
            return Err(QuestionError::InvalidDifficulty(difficulty));
        }
        answer.check()?;

        Ok(Self {
            id,
            topic_id,
            prompt,
            prompt_markup: None,
            answer,
            difficulty,
            hints: Vec::new(),
            solution_steps: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_prompt_markup(mut self, markup: impl Into<String>) -> Self {
        self.prompt_markup = Some(markup.into());
        self
    }

    #[must_use]
    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints = hints.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_solution_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.solution_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn prompt_markup(&self) -> Option<&str> {
        self.prompt_markup.as_deref()
    }

    #[must_use]
    pub fn answer(&self) -> &AnswerSpec {
        &self.answer
    }

    #[must_use]
    pub fn answer_type(&self) -> AnswerType {
        self.answer.answer_type()
    }

    #[must_use]
    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    #[must_use]
    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    #[must_use]
    pub fn solution_steps(&self) -> &[String] {
        &self.solution_steps
    }
}
