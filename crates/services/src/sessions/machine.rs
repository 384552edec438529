use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

use tutor_core::answer::{Answer, AnswerValidator, Validation};
use tutor_core::model::{
    AnswerType, AttemptRecord, FlagRecord, FlagType, PracticeMode, Question, QuestionId,
    SessionSummary,
};
use tutor_core::time::elapsed_seconds;

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    Presenting,
    Submitted,
    Completed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionPhase::NotStarted => "not started",
            SessionPhase::Presenting => "presenting",
            SessionPhase::Submitted => "submitted",
            SessionPhase::Completed => "completed",
        })
    }
}

//
// ─── PER-QUESTION STATE ────────────────────────────────────────────────────────
//

/// Transient state for the question currently on screen.
///
/// Created when a question becomes current and dropped on advance.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionAttemptState {
    answer_text: String,
    selected_choice: Option<usize>,
    validation: Option<Validation>,
    hints_revealed: usize,
    solution_revealed: bool,
    flag: Option<FlagRecord>,
    presented_at: DateTime<Utc>,
}

impl QuestionAttemptState {
    fn new(presented_at: DateTime<Utc>) -> Self {
        Self {
            answer_text: String::new(),
            selected_choice: None,
            validation: None,
            hints_revealed: 0,
            solution_revealed: false,
            flag: None,
            presented_at,
        }
    }

    #[must_use]
    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    #[must_use]
    pub fn selected_choice(&self) -> Option<usize> {
        self.selected_choice
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.validation.is_some()
    }

    /// `None` until submitted.
    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.validation.as_ref().map(|v| v.is_correct)
    }

    #[must_use]
    pub fn validation(&self) -> Option<&Validation> {
        self.validation.as_ref()
    }

    #[must_use]
    pub fn hints_revealed(&self) -> usize {
        self.hints_revealed
    }

    #[must_use]
    pub fn solution_revealed(&self) -> bool {
        self.solution_revealed
    }

    #[must_use]
    pub fn flag(&self) -> Option<&FlagRecord> {
        self.flag.as_ref()
    }

    #[must_use]
    pub fn presented_at(&self) -> DateTime<Utc> {
        self.presented_at
    }

    fn answer(&self) -> Answer {
        Answer {
            text: self.answer_text.clone(),
            choice: self.selected_choice,
        }
    }
}

//
// ─── COUNTERS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub total: u32,
    pub correct: u32,
    pub streak: u32,
    pub best_streak: u32,
}

impl SessionStats {
    fn record(&mut self, is_correct: bool) {
        self.total = self.total.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
            self.streak = self.streak.saturating_add(1);
            self.best_streak = self.best_streak.max(self.streak);
        } else {
            self.streak = 0;
        }
    }
}

//
// ─── ACTIONS & EVENTS ──────────────────────────────────────────────────────────
//

/// Learner-driven inputs to the session reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Start,
    Input(String),
    SelectChoice(usize),
    RevealHint,
    Submit,
    RevealSolution,
    Flag {
        flag_type: FlagType,
        comment: Option<String>,
    },
    Next,
}

/// Local feedback for a submitted answer plus the record to send outward.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub question_id: QuestionId,
    pub validation: Validation,
    pub record: AttemptRecord,
    pub stats: SessionStats,
}

/// Where the session went after "next".
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next { index: usize },
    Completed(SessionSummary),
}

/// What a reducer step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started,
    InputUpdated,
    HintRevealed { index: usize, hint: String },
    Submitted(SubmissionOutcome),
    SolutionRevealed(Vec<String>),
    Flagged(FlagRecord),
    Advanced(Advance),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory practice session over a frozen question list.
///
/// Steps through the list one question at a time:
/// `NotStarted → Presenting → Submitted → (Presenting | Completed)`.
pub struct PracticeSession {
    mode: PracticeMode,
    questions: Vec<Question>,
    validator: AnswerValidator,
    current: usize,
    phase: SessionPhase,
    attempt: Option<QuestionAttemptState>,
    stats: SessionStats,
    started_at: Option<DateTime<Utc>>,
    summary: Option<SessionSummary>,
}

impl PracticeSession {
    /// Create a session over an already sampled list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` for an empty list and
    /// `SessionError::DuplicateQuestion` if an id appears twice.
    pub fn new(
        mode: PracticeMode,
        questions: Vec<Question>,
        validator: AnswerValidator,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        if let Some(dup) = questions.iter().map(Question::id).find(|id| !seen.insert(*id)) {
            return Err(SessionError::DuplicateQuestion(dup));
        }

        Ok(Self {
            mode,
            questions,
            validator,
            current: 0,
            phase: SessionPhase::NotStarted,
            attempt: None,
            stats: SessionStats::default(),
            started_at: None,
            summary: None,
        })
    }

    #[must_use]
    pub fn mode(&self) -> &PracticeMode {
        &self.mode
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question on screen, `None` before start and after completion.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            SessionPhase::Presenting | SessionPhase::Submitted => self.questions.get(self.current),
            SessionPhase::NotStarted | SessionPhase::Completed => None,
        }
    }

    #[must_use]
    pub fn attempt(&self) -> Option<&QuestionAttemptState> {
        self.attempt.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.stats.total as usize;
        SessionProgress {
            total: self.questions.len(),
            answered,
            remaining: self.questions.len().saturating_sub(answered),
            correct: self.stats.correct,
            streak: self.stats.streak,
            is_complete: self.is_complete(),
        }
    }

    /// Single entry point for learner actions.
    ///
    /// # Errors
    ///
    /// Returns whatever the matching method returns for an illegal action.
    pub fn apply(
        &mut self,
        action: SessionAction,
        now: DateTime<Utc>,
    ) -> Result<SessionEvent, SessionError> {
        match action {
            SessionAction::Start => self.start(now).map(|()| SessionEvent::Started),
            SessionAction::Input(text) => {
                self.set_answer_text(text).map(|()| SessionEvent::InputUpdated)
            }
            SessionAction::SelectChoice(index) => {
                self.select_choice(index).map(|()| SessionEvent::InputUpdated)
            }
            SessionAction::RevealHint => {
                let (index, hint) = self.reveal_hint()?;
                Ok(SessionEvent::HintRevealed {
                    index,
                    hint: hint.to_owned(),
                })
            }
            SessionAction::Submit => self.submit(now).map(SessionEvent::Submitted),
            SessionAction::RevealSolution => self
                .reveal_solution()
                .map(|steps| SessionEvent::SolutionRevealed(steps.to_vec())),
            SessionAction::Flag { flag_type, comment } => {
                self.flag(flag_type, comment).map(SessionEvent::Flagged)
            }
            SessionAction::Next => self.next(now).map(SessionEvent::Advanced),
        }
    }

    /// `NotStarted → Presenting` on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` if already started.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.expect_phase("start", SessionPhase::NotStarted)?;
        self.current = 0;
        self.started_at = Some(now);
        self.attempt = Some(QuestionAttemptState::new(now));
        self.phase = SessionPhase::Presenting;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless presenting.
    pub fn set_answer_text(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let attempt = self.presenting_attempt("edit the answer")?;
        attempt.answer_text = text.into();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidChoice` for an index past the choice list,
    /// or `SessionError::InvalidTransition` unless presenting.
    pub fn select_choice(&mut self, index: usize) -> Result<(), SessionError> {
        self.expect_phase("select a choice", SessionPhase::Presenting)?;
        let len = self.current_question_ref()?.answer().choices().len();
        if index >= len {
            return Err(SessionError::InvalidChoice { index, len });
        }
        let attempt = self.presenting_attempt("select a choice")?;
        attempt.selected_choice = Some(index);
        Ok(())
    }

    /// Reveal the next hint; only while the answer is still open.
    ///
    /// Returns the zero-based hint index and its text.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::HintsExhausted` once every hint is shown, or
    /// `SessionError::InvalidTransition` unless presenting.
    pub fn reveal_hint(&mut self) -> Result<(usize, &str), SessionError> {
        self.expect_phase("reveal a hint", SessionPhase::Presenting)?;
        let available = self.current_question_ref()?.hints().len();
        let attempt = self.presenting_attempt("reveal a hint")?;
        if attempt.hints_revealed >= available {
            return Err(SessionError::HintsExhausted);
        }
        attempt.hints_revealed += 1;
        let index = attempt.hints_revealed - 1;
        let hint = self
            .questions
            .get(self.current)
            .and_then(|q| q.hints().get(index))
            .ok_or(SessionError::HintsExhausted)?;
        Ok((index, hint.as_str()))
    }

    /// `Presenting → Submitted`: check the answer and update counters.
    ///
    /// The returned outcome carries the attempt record for the attempt sink;
    /// nothing here waits on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyAnswer` when nothing was entered (or no
    /// choice selected for multiple choice), or
    /// `SessionError::InvalidTransition` unless presenting.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<SubmissionOutcome, SessionError> {
        self.expect_phase("submit", SessionPhase::Presenting)?;
        let question = self.current_question_ref()?;
        let question_id = question.id();
        let answer_type = question.answer_type();
        let attempt = self.attempt.as_ref().ok_or(SessionError::Completed)?;

        let has_answer = match answer_type {
            AnswerType::MultipleChoice => attempt.selected_choice.is_some(),
            _ => !attempt.answer_text.trim().is_empty(),
        };
        if !has_answer {
            return Err(SessionError::EmptyAnswer);
        }

        let validation = self.validator.check(question.answer(), &attempt.answer());
        let answer_raw = match (answer_type, attempt.selected_choice) {
            (AnswerType::MultipleChoice, Some(index)) => question
                .answer()
                .choices()
                .get(index)
                .cloned()
                .unwrap_or_default(),
            _ => attempt.answer_text.clone(),
        };
        let record = AttemptRecord {
            question_id,
            answer_raw,
            is_correct: validation.is_correct,
            time_spent_seconds: elapsed_seconds(attempt.presented_at, now),
            hints_used: u32::try_from(attempt.hints_revealed).unwrap_or(u32::MAX),
        };

        self.stats.record(validation.is_correct);
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.validation = Some(validation.clone());
        }
        self.phase = SessionPhase::Submitted;

        Ok(SubmissionOutcome {
            question_id,
            validation,
            record,
            stats: self.stats,
        })
    }

    /// Show the worked solution; only after submitting.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless submitted.
    pub fn reveal_solution(&mut self) -> Result<&[String], SessionError> {
        self.expect_phase("reveal the solution", SessionPhase::Submitted)?;
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.solution_revealed = true;
        }
        Ok(self.current_question_ref()?.solution_steps())
    }

    /// Report the current question. Allowed once per question; does not touch
    /// correctness or the main transitions.
    ///
    /// The returned record has no attempt id; the caller attaches one if the
    /// attempt sink produced it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyFlagged` on a second flag, or
    /// `SessionError::InvalidTransition` outside presenting/submitted.
    pub fn flag(
        &mut self,
        flag_type: FlagType,
        comment: Option<String>,
    ) -> Result<FlagRecord, SessionError> {
        if !matches!(self.phase, SessionPhase::Presenting | SessionPhase::Submitted) {
            return Err(SessionError::InvalidTransition {
                action: "flag",
                phase: self.phase,
            });
        }
        let question = self.current_question_ref()?;
        let question_id = question.id();
        let choice_text = self
            .attempt
            .as_ref()
            .and_then(|a| a.selected_choice)
            .and_then(|i| question.answer().choices().get(i).cloned());

        let attempt = self.attempt.as_mut().ok_or(SessionError::Completed)?;
        if attempt.flag.is_some() {
            return Err(SessionError::AlreadyFlagged);
        }
        let typed = Some(attempt.answer_text.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        let record = FlagRecord {
            question_id,
            flag_type,
            comment: comment.filter(|c| !c.trim().is_empty()),
            student_answer: choice_text.or(typed),
            attempt_id: None,
        };
        attempt.flag = Some(record.clone());
        Ok(record)
    }

    /// `Submitted → Presenting` on the next question, or `→ Completed` after
    /// the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless submitted, or
    /// `SessionError::Summary` if the final counters are inconsistent.
    pub fn next(&mut self, now: DateTime<Utc>) -> Result<Advance, SessionError> {
        self.expect_phase("advance", SessionPhase::Submitted)?;
        self.attempt = None;

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.attempt = Some(QuestionAttemptState::new(now));
            self.phase = SessionPhase::Presenting;
            return Ok(Advance::Next {
                index: self.current,
            });
        }

        let summary = SessionSummary::new(
            self.started_at.unwrap_or(now),
            now,
            self.stats.total,
            self.stats.correct,
            self.stats.best_streak,
        )?;
        self.phase = SessionPhase::Completed;
        self.summary = Some(summary.clone());
        Ok(Advance::Completed(summary))
    }

    fn expect_phase(&self, action: &'static str, wanted: SessionPhase) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Completed {
            return Err(SessionError::Completed);
        }
        if self.phase != wanted {
            return Err(SessionError::InvalidTransition {
                action,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn current_question_ref(&self) -> Result<&Question, SessionError> {
        self.questions
            .get(self.current)
            .ok_or(SessionError::Completed)
    }

    fn presenting_attempt(
        &mut self,
        action: &'static str,
    ) -> Result<&mut QuestionAttemptState, SessionError> {
        self.expect_phase(action, SessionPhase::Presenting)?;
        self.attempt.as_mut().ok_or(SessionError::Completed)
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("mode", &self.mode)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("stats", &self.stats)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tutor_core::model::{AnswerSpec, TopicId};
    use tutor_core::time::fixed_now;

    fn exact(id: u64, answer: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            TopicId::new(1),
            format!("Q{id}"),
            AnswerSpec::exact(answer),
            2,
        )
        .unwrap()
        .with_hints(["first hint", "second hint"])
        .with_solution_steps(["step one", "step two"])
    }

    fn choice(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            TopicId::new(1),
            "Pick",
            AnswerSpec::multiple_choice(["red", "green", "blue"], 1),
            1,
        )
        .unwrap()
    }

    fn session(questions: Vec<Question>) -> PracticeSession {
        let mut session = PracticeSession::new(
            PracticeMode::Topic(TopicId::new(1)),
            questions,
            AnswerValidator::default(),
        )
        .unwrap();
        session.start(fixed_now()).unwrap();
        session
    }

    #[test]
    fn empty_and_duplicate_lists_are_rejected() {
        let err = PracticeSession::new(PracticeMode::Review, Vec::new(), AnswerValidator::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::Empty));

        let err = PracticeSession::new(
            PracticeMode::Review,
            vec![exact(1, "a"), exact(1, "a")],
            AnswerValidator::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::DuplicateQuestion(id) if id == QuestionId::new(1)));
    }

    #[test]
    fn start_presents_first_question() {
        let mut session = PracticeSession::new(
            PracticeMode::Review,
            vec![exact(1, "a")],
            AnswerValidator::default(),
        )
        .unwrap();
        assert_eq!(session.phase(), SessionPhase::NotStarted);
        assert!(session.current_question().is_none());

        let event = session.apply(SessionAction::Start, fixed_now()).unwrap();
        assert_eq!(event, SessionEvent::Started);
        assert_eq!(session.phase(), SessionPhase::Presenting);
        assert_eq!(session.current_question().unwrap().id(), QuestionId::new(1));
        assert!(matches!(
            session.start(fixed_now()),
            Err(SessionError::InvalidTransition { action: "start", .. })
        ));
    }

    #[test]
    fn submit_requires_an_answer() {
        let mut session = session(vec![exact(1, "a"), choice(2)]);
        session.set_answer_text("   ").unwrap();
        assert!(matches!(session.submit(fixed_now()), Err(SessionError::EmptyAnswer)));
        assert_eq!(session.phase(), SessionPhase::Presenting);
        assert_eq!(session.stats().total, 0);
    }

    #[test]
    fn multiple_choice_requires_a_selection() {
        let mut session = session(vec![choice(1)]);
        session.set_answer_text("green").unwrap();
        assert!(matches!(session.submit(fixed_now()), Err(SessionError::EmptyAnswer)));

        assert!(matches!(
            session.select_choice(3),
            Err(SessionError::InvalidChoice { index: 3, len: 3 })
        ));
        session.select_choice(1).unwrap();
        let outcome = session.submit(fixed_now()).unwrap();
        assert!(outcome.validation.is_correct);
        assert_eq!(outcome.record.answer_raw, "green");
    }

    #[test]
    fn submission_updates_counters_and_streak() {
        let mut session = session(vec![exact(1, "a"), exact(2, "b"), exact(3, "c")]);

        session.set_answer_text("a").unwrap();
        let first = session.submit(fixed_now()).unwrap();
        assert!(first.validation.is_correct);
        assert_eq!(first.stats.streak, 1);
        session.next(fixed_now()).unwrap();

        session.set_answer_text("b").unwrap();
        let second = session.submit(fixed_now()).unwrap();
        assert_eq!(second.stats.streak, 2);
        session.next(fixed_now()).unwrap();

        session.set_answer_text("wrong").unwrap();
        let third = session.submit(fixed_now()).unwrap();
        assert!(!third.validation.is_correct);
        assert_eq!(
            third.stats,
            SessionStats {
                total: 3,
                correct: 2,
                streak: 0,
                best_streak: 2
            }
        );
    }

    #[test]
    fn attempt_record_carries_time_and_hints() {
        let mut session = session(vec![exact(1, "a")]);
        session.reveal_hint().unwrap();
        session.set_answer_text("a").unwrap();

        let outcome = session.submit(fixed_now() + Duration::seconds(45)).unwrap();
        assert_eq!(
            outcome.record,
            AttemptRecord {
                question_id: QuestionId::new(1),
                answer_raw: "a".into(),
                is_correct: true,
                time_spent_seconds: 45,
                hints_used: 1,
            }
        );
    }

    #[test]
    fn hints_are_bounded_and_only_while_presenting() {
        let mut session = session(vec![exact(1, "a")]);
        assert_eq!(session.reveal_hint().unwrap(), (0, "first hint"));
        assert_eq!(session.reveal_hint().unwrap(), (1, "second hint"));
        assert!(matches!(session.reveal_hint(), Err(SessionError::HintsExhausted)));
        assert_eq!(session.attempt().unwrap().hints_revealed(), 2);

        session.set_answer_text("a").unwrap();
        session.submit(fixed_now()).unwrap();
        assert!(matches!(
            session.reveal_hint(),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert_eq!(session.attempt().unwrap().hints_revealed(), 2);
    }

    #[test]
    fn question_without_hints_reveals_none() {
        let mut session = session(vec![choice(1)]);
        assert!(matches!(session.reveal_hint(), Err(SessionError::HintsExhausted)));
    }

    #[test]
    fn solution_only_after_submit() {
        let mut session = session(vec![exact(1, "a")]);
        assert!(matches!(
            session.reveal_solution(),
            Err(SessionError::InvalidTransition { phase: SessionPhase::Presenting, .. })
        ));
        assert!(!session.attempt().unwrap().solution_revealed());

        session.set_answer_text("nope").unwrap();
        session.submit(fixed_now()).unwrap();
        let steps = session.reveal_solution().unwrap();
        assert_eq!(steps, ["step one", "step two"]);
        assert!(session.attempt().unwrap().solution_revealed());
    }

    #[test]
    fn flag_is_once_per_question_and_keeps_correctness() {
        let mut session = session(vec![exact(1, "a"), exact(2, "b")]);
        session.set_answer_text("x").unwrap();
        session.submit(fixed_now()).unwrap();

        let record = session
            .flag(FlagType::ClaimCorrect, Some("x is also right".into()))
            .unwrap();
        assert_eq!(record.student_answer.as_deref(), Some("x"));
        assert_eq!(record.attempt_id, None);
        assert!(matches!(
            session.flag(FlagType::Typo, None),
            Err(SessionError::AlreadyFlagged)
        ));
        assert_eq!(session.attempt().unwrap().is_correct(), Some(false));
        assert_eq!(session.phase(), SessionPhase::Submitted);

        session.next(fixed_now()).unwrap();
        assert!(session.flag(FlagType::Unclear, None).is_ok());
    }

    #[test]
    fn next_requires_submission() {
        let mut session = session(vec![exact(1, "a"), exact(2, "b")]);
        assert!(matches!(
            session.next(fixed_now()),
            Err(SessionError::InvalidTransition { action: "advance", .. })
        ));
    }

    #[test]
    fn advancing_resets_per_question_state() {
        let mut session = session(vec![exact(1, "a"), exact(2, "b")]);
        session.reveal_hint().unwrap();
        session.set_answer_text("a").unwrap();
        session.submit(fixed_now()).unwrap();

        let advance = session.next(fixed_now() + Duration::seconds(10)).unwrap();
        assert_eq!(advance, Advance::Next { index: 1 });
        assert_eq!(session.current_index(), 1);
        let attempt = session.attempt().unwrap();
        assert_eq!(attempt.answer_text(), "");
        assert_eq!(attempt.hints_revealed(), 0);
        assert!(!attempt.is_submitted());
        assert_eq!(attempt.presented_at(), fixed_now() + Duration::seconds(10));
    }

    #[test]
    fn last_next_completes_instead_of_presenting() {
        let mut session = session(vec![exact(1, "a")]);
        session.set_answer_text("a").unwrap();
        session.submit(fixed_now()).unwrap();

        let end = fixed_now() + Duration::minutes(2);
        let Advance::Completed(summary) = session.next(end).unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(session.phase(), SessionPhase::Completed);
        assert!(session.is_complete());
        assert!(session.current_question().is_none());
        assert_eq!(summary.total(), 1);
        assert_eq!(summary.correct(), 1);
        assert_eq!(summary.completed_at(), end);
        assert!(matches!(session.submit(end), Err(SessionError::Completed)));
        assert!(session.progress().is_complete);
    }

    #[test]
    fn reducer_drives_a_full_question() {
        let mut session = session(vec![exact(1, "a")]);
        let now = fixed_now();

        let hint = session.apply(SessionAction::RevealHint, now).unwrap();
        assert_eq!(
            hint,
            SessionEvent::HintRevealed {
                index: 0,
                hint: "first hint".into()
            }
        );
        session.apply(SessionAction::Input("A".into()), now).unwrap();
        let SessionEvent::Submitted(outcome) = session.apply(SessionAction::Submit, now).unwrap()
        else {
            panic!("expected submission");
        };
        assert!(outcome.validation.is_correct);

        let solution = session.apply(SessionAction::RevealSolution, now).unwrap();
        assert_eq!(
            solution,
            SessionEvent::SolutionRevealed(vec!["step one".into(), "step two".into()])
        );
        let done = session.apply(SessionAction::Next, now).unwrap();
        assert!(matches!(done, SessionEvent::Advanced(Advance::Completed(_))));
    }
}
