mod attempt;
mod evaluation;
mod ids;
mod user;

pub use attempt::{
    AnswerValue, Answers, Attempt, AttemptState, LocalCacheEntry, SubmissionResult, TimeSync,
};
pub use evaluation::{Choice, Evaluation, Question, QuestionKind, StartEligibility};
pub use ids::{AttemptId, EvaluationId, ParseIdError, QuestionId, UserId};
pub use user::{SessionUser, TokenPair};
