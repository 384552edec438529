use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use storage::Storage;
use tutor_core::answer::AnswerValidator;
use tutor_core::model::{AttemptId, EmptyPool, FlagRecord, FlagType, PracticeMode, PracticeSettings};

use super::history::HistoryIndex;
use super::machine::{Advance, PracticeSession, SessionPhase, SubmissionOutcome};
use super::pool::{CandidatePoolResolver, ResolvedPool};
use super::sampler::SmartSampler;
use crate::Clock;
use crate::error::SessionError;

/// Result of asking for a new session.
#[derive(Debug)]
pub enum SessionStart {
    Ready(PracticeRun),
    /// Nothing to practice; carries the reason for the empty state.
    Nothing(EmptyPool),
}

/// A started session plus the background sink calls it spawned.
pub struct PracticeRun {
    session: PracticeSession,
    pending_attempt: Option<oneshot::Receiver<AttemptId>>,
    background: Vec<JoinHandle<()>>,
}

impl PracticeRun {
    fn new(session: PracticeSession) -> Self {
        Self {
            session,
            pending_attempt: None,
            background: Vec::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &PracticeSession {
        &self.session
    }

    /// Direct access for actions that never leave the process (input, hints, solution).
    pub fn session_mut(&mut self) -> &mut PracticeSession {
        &mut self.session
    }

    /// Wait for every spawned sink call to finish.
    ///
    /// Only needed before shutdown or in tests; the session never waits on it.
    pub async fn flush(&mut self) {
        for handle in self.background.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "background sink task failed");
            }
        }
    }
}

impl std::fmt::Debug for PracticeRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PracticeRun")
            .field("session", &self.session)
            .field("background", &self.background.len())
            .finish_non_exhaustive()
    }
}

/// Orchestrates session start and the outbound attempt/flag calls.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    storage: Storage,
    settings: PracticeSettings,
    seed: Option<u64>,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage) -> Self {
        Self {
            clock,
            storage,
            settings: PracticeSettings::default(),
            seed: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PracticeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Fix the sampling seed so session order is reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Resolve, sample and start a session for `mode`.
    ///
    /// `target` overrides the configured session size for adaptive modes.
    /// The history snapshot is read once here; the returned list is frozen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when a collaborator fails.
    #[instrument(skip_all, fields(mode = %mode, target = ?target))]
    pub async fn start_session(
        &self,
        mode: PracticeMode,
        target: Option<usize>,
    ) -> Result<SessionStart, SessionError> {
        let now = self.clock.now();
        let history = HistoryIndex::build(self.storage.history.learner_history().await?);
        let resolver = CandidatePoolResolver::new(
            self.storage.questions.as_ref(),
            self.storage.reviews.as_ref(),
            &self.settings,
        );
        let pool = resolver.resolve(&mode, &history, now).await?;

        let sampler = SmartSampler::from_settings(&self.settings);
        let mut rng = self.rng();
        let questions = match pool {
            ResolvedPool::Empty(reason) => {
                info!(%reason, "nothing to practice");
                return Ok(SessionStart::Nothing(reason));
            }
            ResolvedPool::Adaptive(pool) => {
                let target = target.unwrap_or(self.settings.session_size()).max(1);
                sampler.sample(pool, &history, target, &mut rng).questions
            }
            ResolvedPool::Manual(pool) => sampler.shuffle_all(pool, &mut rng),
        };

        let validator = AnswerValidator::new(self.settings.default_tolerance());
        let mut session = PracticeSession::new(mode, questions, validator)?;
        session.start(now)?;
        info!(questions = session.questions().len(), "session started");
        Ok(SessionStart::Ready(PracticeRun::new(session)))
    }

    /// Submit the current answer and report it to the attempt sink.
    ///
    /// The outcome is computed locally and returned immediately; the sink call
    /// runs on a spawned task and a failure there is only logged. Must be
    /// called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the state machine's error when submitting is not allowed.
    pub fn submit(&self, run: &mut PracticeRun) -> Result<SubmissionOutcome, SessionError> {
        let outcome = run.session.submit(self.clock.now())?;

        let (tx, rx) = oneshot::channel();
        run.pending_attempt = Some(rx);
        let sink = Arc::clone(&self.storage.attempts);
        let record = outcome.record.clone();
        run.background.push(tokio::spawn(async move {
            match sink.record_attempt(&record).await {
                Ok(id) => {
                    debug!(question_id = %record.question_id, attempt_id = %id, "attempt recorded");
                    // Receiver is gone once the learner moved on without flagging.
                    let _ = tx.send(id);
                }
                Err(err) => {
                    warn!(question_id = %record.question_id, error = %err, "failed to record attempt");
                }
            }
        }));

        Ok(outcome)
    }

    /// Flag the current question and forward the report to the moderation sink.
    ///
    /// When the answer was already submitted, the spawned task waits for the
    /// attempt id and attaches it; the returned record never carries one.
    ///
    /// # Errors
    ///
    /// Returns the state machine's error when flagging is not allowed.
    pub fn flag(
        &self,
        run: &mut PracticeRun,
        flag_type: FlagType,
        comment: Option<String>,
    ) -> Result<FlagRecord, SessionError> {
        let record = run.session.flag(flag_type, comment)?;
        let pending = if run.session.phase() == SessionPhase::Submitted {
            run.pending_attempt.take()
        } else {
            None
        };

        let sink = Arc::clone(&self.storage.flags);
        let mut outbound = record.clone();
        run.background.push(tokio::spawn(async move {
            if let Some(rx) = pending {
                outbound.attempt_id = rx.await.ok();
            }
            if let Err(err) = sink.submit_flag(&outbound).await {
                warn!(question_id = %outbound.question_id, error = %err, "failed to submit flag");
            }
        }));

        Ok(record)
    }

    /// Advance to the next question or complete the session.
    ///
    /// # Errors
    ///
    /// Returns the state machine's error when advancing is not allowed.
    pub fn next(&self, run: &mut PracticeRun) -> Result<Advance, SessionError> {
        let advance = run.session.next(self.clock.now())?;
        run.pending_attempt = None;
        if let Advance::Completed(summary) = &advance {
            info!(
                total = summary.total(),
                correct = summary.correct(),
                best_streak = summary.best_streak(),
                "session completed"
            );
        }
        Ok(advance)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::{AttemptSink, FlagSink, InMemoryRepository, StorageError};
    use tutor_core::model::{AnswerSpec, AttemptRecord, Question, QuestionId, TopicId};
    use tutor_core::time::fixed_clock;

    struct OfflineSink;

    #[async_trait]
    impl AttemptSink for OfflineSink {
        async fn record_attempt(&self, _record: &AttemptRecord) -> Result<AttemptId, StorageError> {
            Err(StorageError::Connection("sink offline".into()))
        }
    }

    struct OfflineFlagSink;

    #[async_trait]
    impl FlagSink for OfflineFlagSink {
        async fn submit_flag(&self, _record: &FlagRecord) -> Result<(), StorageError> {
            Err(StorageError::Connection("moderation queue offline".into()))
        }
    }

    fn repo_with(count: u64) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for id in 1..=count {
            let question = Question::new(
                QuestionId::new(id),
                TopicId::new(1),
                format!("What is {id} + 0?"),
                AnswerSpec::numeric(id as f64, None),
                1,
            )
            .unwrap();
            repo.upsert_question(question).unwrap();
        }
        repo
    }

    async fn start(service: &PracticeLoopService, mode: PracticeMode) -> PracticeRun {
        match service.start_session(mode, None).await.unwrap() {
            SessionStart::Ready(run) => run,
            SessionStart::Nothing(reason) => panic!("unexpected empty pool: {reason}"),
        }
    }

    fn answer_current(run: &mut PracticeRun) {
        let id = run.session().current_question().unwrap().id().value();
        run.session_mut().set_answer_text(id.to_string()).unwrap();
    }

    #[tokio::test]
    async fn failed_attempt_sink_keeps_local_feedback() {
        let repo = repo_with(2);
        let storage = Storage::from_memory(&repo).with_attempt_sink(Arc::new(OfflineSink));
        let service = PracticeLoopService::new(fixed_clock(), storage).with_seed(1);
        let mut run = start(&service, PracticeMode::Topic(TopicId::new(1))).await;

        answer_current(&mut run);
        let outcome = service.submit(&mut run).unwrap();
        assert!(outcome.validation.is_correct);
        assert_eq!(outcome.stats.correct, 1);

        run.flush().await;
        assert!(repo.recorded_attempts().unwrap().is_empty());
        assert_eq!(run.session().phase(), SessionPhase::Submitted);
    }

    #[tokio::test]
    async fn failed_flag_sink_leaves_session_untouched() {
        let repo = repo_with(2);
        let storage = Storage::from_memory(&repo).with_flag_sink(Arc::new(OfflineFlagSink));
        let service = PracticeLoopService::new(fixed_clock(), storage).with_seed(2);
        let mut run = start(&service, PracticeMode::Topic(TopicId::new(1))).await;

        answer_current(&mut run);
        service.submit(&mut run).unwrap();
        let record = service
            .flag(&mut run, FlagType::IncorrectAnswer, Some("looks off".into()))
            .unwrap();
        assert_eq!(record.flag_type, FlagType::IncorrectAnswer);

        run.flush().await;
        assert!(repo.recorded_flags().unwrap().is_empty());
        assert_eq!(repo.recorded_attempts().unwrap().len(), 1);
        assert_eq!(run.session().phase(), SessionPhase::Submitted);
        assert_eq!(run.session().attempt().unwrap().is_correct(), Some(true));
        assert_eq!(run.session().stats().correct, 1);
        assert!(service.next(&mut run).is_ok());
    }

    #[tokio::test]
    async fn flag_after_submit_carries_attempt_id() {
        let repo = repo_with(2);
        let service =
            PracticeLoopService::new(fixed_clock(), Storage::from_memory(&repo)).with_seed(3);
        let mut run = start(&service, PracticeMode::Topic(TopicId::new(1))).await;

        run.session_mut().set_answer_text("999").unwrap();
        service.submit(&mut run).unwrap();
        let local = service
            .flag(&mut run, FlagType::ClaimCorrect, Some("close enough".into()))
            .unwrap();
        assert_eq!(local.attempt_id, None);

        run.flush().await;
        let flags = repo.recorded_flags().unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].attempt_id, Some(AttemptId::new(1)));
        assert_eq!(flags[0].student_answer.as_deref(), Some("999"));
    }

    #[tokio::test]
    async fn flag_before_submit_has_no_attempt_id() {
        let repo = repo_with(1);
        let service = PracticeLoopService::new(fixed_clock(), Storage::from_memory(&repo));
        let mut run = start(&service, PracticeMode::Topic(TopicId::new(1))).await;

        service.flag(&mut run, FlagType::Unclear, None).unwrap();
        run.flush().await;

        let flags = repo.recorded_flags().unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].attempt_id, None);
        assert_eq!(flags[0].student_answer, None);
    }

    #[tokio::test]
    async fn empty_topic_reports_reason() {
        let service = PracticeLoopService::new(fixed_clock(), Storage::in_memory());
        let start = service
            .start_session(PracticeMode::Topic(TopicId::new(5)), None)
            .await
            .unwrap();
        assert!(matches!(
            start,
            SessionStart::Nothing(EmptyPool::NoTopicQuestions(topic)) if topic == TopicId::new(5)
        ));
    }

    #[tokio::test]
    async fn target_override_caps_adaptive_sessions() {
        let repo = repo_with(12);
        let service =
            PracticeLoopService::new(fixed_clock(), Storage::from_memory(&repo)).with_seed(11);
        let SessionStart::Ready(run) = service
            .start_session(PracticeMode::Topic(TopicId::new(1)), Some(5))
            .await
            .unwrap()
        else {
            panic!("expected a session");
        };
        assert_eq!(run.session().questions().len(), 5);
    }

    #[tokio::test]
    async fn custom_sessions_are_sized_to_the_selection() {
        let repo = repo_with(6);
        let service =
            PracticeLoopService::new(fixed_clock(), Storage::from_memory(&repo)).with_seed(5);
        let ids = [1, 2, 3, 4].map(QuestionId::new).to_vec();
        let SessionStart::Ready(run) = service
            .start_session(PracticeMode::Custom(ids), Some(2))
            .await
            .unwrap()
        else {
            panic!("expected a session");
        };

        let mut picked: Vec<_> = run.session().questions().iter().map(Question::id).collect();
        picked.sort();
        assert_eq!(picked, [1, 2, 3, 4].map(QuestionId::new).to_vec());
    }

    #[tokio::test]
    async fn same_seed_gives_same_order() {
        let repo = repo_with(30);
        let storage = Storage::from_memory(&repo);
        let first = PracticeLoopService::new(fixed_clock(), storage.clone()).with_seed(42);
        let second = PracticeLoopService::new(fixed_clock(), storage).with_seed(42);

        let a = start(&first, PracticeMode::Topic(TopicId::new(1))).await;
        let b = start(&second, PracticeMode::Topic(TopicId::new(1))).await;
        let ids = |run: &PracticeRun| -> Vec<QuestionId> {
            run.session().questions().iter().map(Question::id).collect()
        };
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.session().questions().len(), 20);
    }
}
