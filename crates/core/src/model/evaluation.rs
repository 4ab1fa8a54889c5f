use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{EvaluationId, QuestionId};

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// How a question expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    OpenText,
    /// Anything the backend adds later; rendered as free text.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: u64,
    pub text: String,
}

/// A single question. Read-only from the session's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Question {
    #[must_use]
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }
}

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// A quiz definition as served by the backend.
///
/// Immutable once fetched; a session re-fetches it on every load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub max_attempts: u32,
    #[serde(default)]
    pub attempts_used: u32,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
}

/// Whether a new attempt may be requested, as far as the client can tell.
///
/// The backend stays authoritative; this only lets callers avoid a request
/// that is bound to be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartEligibility {
    Open,
    PastDue,
    AttemptsExhausted { used: u32, max: u32 },
}

impl Evaluation {
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    #[must_use]
    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts_used)
    }

    #[must_use]
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at.is_some_and(|due| now > due)
    }

    #[must_use]
    pub fn start_eligibility(&self, now: DateTime<Utc>) -> StartEligibility {
        if self.is_past_due(now) {
            return StartEligibility::PastDue;
        }
        if self.attempts_remaining() == 0 {
            return StartEligibility::AttemptsExhausted {
                used: self.attempts_used,
                max: self.max_attempts,
            };
        }
        StartEligibility::Open
    }
}
