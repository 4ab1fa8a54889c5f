use std::sync::Arc;

use aula_core::ErrorKind;
use aula_core::model::{Answers, Attempt, Evaluation, LocalCacheEntry, SubmissionResult};

/// Lifecycle of an evaluation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Loading,
    /// Evaluation shown without an active attempt.
    Viewing,
    InProgress,
    Submitting,
    Completed,
    /// Recoverable by calling `load` again.
    Failed(ErrorKind),
}

impl SessionPhase {
    #[must_use]
    pub fn is_failed(self) -> bool {
        matches!(self, SessionPhase::Failed(_))
    }
}

/// Everything the UI renders about a session, published through a `Store`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub evaluation: Option<Arc<Evaluation>>,
    pub attempt: Option<Attempt>,
    pub answers: Answers,
    /// Seconds left on the countdown, once an attempt is active.
    pub remaining_time: Option<u32>,
    pub is_loading: bool,
    pub last_error: Option<ErrorKind>,
    /// Locally cached answers found when the backend reported no attempt.
    pub resume_hint: Option<LocalCacheEntry>,
    pub result: Option<SubmissionResult>,
}

impl SessionSnapshot {
    /// Share of questions answered, in percent.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        let total = self.evaluation.as_ref().map_or(0, |e| e.question_count());
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.answers.len() as f64 / total as f64;
        ratio * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aula_core::model::{EvaluationId, Question, QuestionId, QuestionKind};

    fn evaluation(questions: u64) -> Evaluation {
        Evaluation {
            id: EvaluationId::new(1),
            title: "E1".into(),
            description: None,
            questions: (1..=questions)
                .map(|id| Question {
                    id: QuestionId::new(id),
                    prompt: format!("Q{id}"),
                    kind: QuestionKind::OpenText,
                    choices: Vec::new(),
                })
                .collect(),
            max_attempts: 1,
            attempts_used: 0,
            due_at: None,
            time_limit_minutes: None,
        }
    }

    #[test]
    fn progress_without_evaluation_is_zero() {
        assert!(SessionSnapshot::default().progress_percent().abs() < f64::EPSILON);
    }

    #[test]
    fn progress_counts_answered_questions() {
        let mut snapshot = SessionSnapshot {
            evaluation: Some(Arc::new(evaluation(4))),
            ..SessionSnapshot::default()
        };
        snapshot.answers.insert(QuestionId::new(1), "A".into());
        assert!((snapshot.progress_percent() - 25.0).abs() < f64::EPSILON);
    }
}
