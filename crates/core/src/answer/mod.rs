mod normalize;
mod validate;

pub use normalize::normalize;
pub use validate::{Answer, AnswerValidator, DEFAULT_NUMERIC_TOLERANCE, Validation, validate};
