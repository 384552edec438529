mod attempt;
mod ids;
mod mode;
mod question;
mod session;
mod settings;

pub use ids::{AttemptId, ParseIdError, QuestionId, TopicId};

pub use attempt::{
    AttemptAggregate, AttemptRecord, FlagRecord, FlagType, LearnerHistory, ParseFlagTypeError,
    TopicAccuracy,
};
pub use mode::{EmptyPool, PracticeMode};
pub use question::{AnswerSpec, AnswerType, Question, QuestionError, TruthValue};
pub use session::{SessionSummary, SessionSummaryError};
pub use settings::{PracticeSettings, SettingsDraft, SettingsError};
