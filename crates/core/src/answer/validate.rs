use crate::answer::normalize::normalize;
use crate::model::AnswerSpec;

/// Numeric tolerance used when a question does not carry its own.
pub const DEFAULT_NUMERIC_TOLERANCE: f64 = 0.001;

/// Slack added to numeric comparisons so that a difference written exactly at
/// the tolerance (e.g. `43.86` vs `43.96` with `0.1`) is not lost to rounding.
const FLOAT_SLACK: f64 = 1e-9;

/// What the learner submitted for the current question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub choice: Option<usize>,
}

impl Answer {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choice: None,
        }
    }

    #[must_use]
    pub fn choice(index: usize) -> Self {
        Self {
            text: String::new(),
            choice: Some(index),
        }
    }
}

/// Outcome of checking one answer.
///
/// `compared` is the value that was actually matched, kept for audit: the
/// normalized text for exact/expression answers, the trimmed text for numeric
/// and true/false answers, and the choice index for multiple choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub is_correct: bool,
    pub compared: String,
}

/// Dispatches answer checking on the question's answer type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerValidator {
    default_tolerance: f64,
}

impl Default for AnswerValidator {
    fn default() -> Self {
        Self {
            default_tolerance: DEFAULT_NUMERIC_TOLERANCE,
        }
    }
}

impl AnswerValidator {
    #[must_use]
    pub fn new(default_tolerance: f64) -> Self {
        Self { default_tolerance }
    }

    #[must_use]
    pub fn default_tolerance(&self) -> f64 {
        self.default_tolerance
    }

    /// Checks `answer` against `spec`. Never fails: unparseable input is
    /// simply incorrect.
    #[must_use]
    pub fn check(&self, spec: &AnswerSpec, answer: &Answer) -> Validation {
        match spec {
            AnswerSpec::MultipleChoice { correct_index, .. } => Validation {
                is_correct: answer.choice == Some(*correct_index),
                compared: answer.choice.map(|i| i.to_string()).unwrap_or_default(),
            },
            AnswerSpec::TrueFalse { value } => {
                let submitted = answer.text.trim().to_lowercase();
                let is_correct = match submitted.as_str() {
                    "true" => value.as_bool(),
                    "false" => !value.as_bool(),
                    _ => false,
                };
                Validation {
                    is_correct,
                    compared: submitted,
                }
            }
            AnswerSpec::Numeric {
                value, tolerance, ..
            } => {
                let submitted = answer.text.trim();
                let tolerance = tolerance.unwrap_or(self.default_tolerance);
                let is_correct = submitted
                    .parse::<f64>()
                    .ok()
                    .filter(|parsed| parsed.is_finite())
                    .is_some_and(|parsed| (parsed - value).abs() <= tolerance + FLOAT_SLACK);
                Validation {
                    is_correct,
                    compared: submitted.to_owned(),
                }
            }
            AnswerSpec::Exact { value, alternates }
            | AnswerSpec::Expression { value, alternates } => {
                let submitted = normalize(&answer.text);
                let is_correct = std::iter::once(value)
                    .chain(alternates)
                    .any(|candidate| normalize(candidate) == submitted);
                Validation {
                    is_correct,
                    compared: submitted,
                }
            }
        }
    }
}

/// Checks an answer with the default numeric tolerance.
#[must_use]
pub fn validate(spec: &AnswerSpec, answer: &Answer) -> Validation {
    AnswerValidator::default().check(spec, answer)
}
