#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use tutor_core::Clock;

pub use error::SessionError;
pub use sessions::{
    HistoryIndex, PracticeLoopService, PracticeRun, PracticeSession, SessionAction, SessionEvent,
    SessionPhase, SessionProgress, SessionStart, SmartSampler,
};
