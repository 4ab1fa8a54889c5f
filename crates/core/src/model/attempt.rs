use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ids::{AttemptId, EvaluationId, QuestionId};

/// An answer as the backend stores it: a choice id, a list of ids, free text…
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerValue(Value);

impl AnswerValue {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_owned()))
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<u64> for AnswerValue {
    fn from(value: u64) -> Self {
        Self(Value::from(value))
    }
}

impl From<Vec<u64>> for AnswerValue {
    fn from(values: Vec<u64>) -> Self {
        Self(Value::from(values))
    }
}

/// Full answer set of an attempt, keyed by question.
pub type Answers = BTreeMap<QuestionId, AnswerValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    InProgress,
    Submitted,
    Expired,
}

impl AttemptState {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, AttemptState::InProgress)
    }
}

/// One user's instance of taking an evaluation.
///
/// Created by the backend; the session keeps a local mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub evaluation_id: EvaluationId,
    pub state: AttemptState,
    #[serde(default)]
    pub answers: Answers,
    /// Seconds left on the countdown.
    pub remaining_time: u32,
    pub started_at: DateTime<Utc>,
}

impl Attempt {
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.state.is_active()
    }
}

/// Authoritative countdown returned by a time synchronization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSync {
    pub remaining_time: u32,
    pub state: AttemptState,
}

/// Whatever the backend reports after grading a submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmissionResult {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Shadow copy of an in-progress attempt kept in client-local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCacheEntry {
    pub evaluation_id: EvaluationId,
    pub answers: Answers,
    pub remaining_time: Option<u32>,
}
