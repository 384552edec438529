mod history;
mod machine;
mod pool;
mod progress;
mod sampler;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use history::HistoryIndex;
pub use machine::{
    Advance, PracticeSession, QuestionAttemptState, SessionAction, SessionEvent, SessionPhase,
    SessionStats, SubmissionOutcome,
};
pub use pool::{CandidatePoolResolver, ResolvedPool};
pub use progress::SessionProgress;
pub use sampler::{SamplePlan, SmartSampler};
pub use workflow::{PracticeLoopService, PracticeRun, SessionStart};
