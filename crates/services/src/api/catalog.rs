use aula_core::model::{AttemptId, Evaluation, EvaluationId, QuestionId, UserId};
use serde::Serialize;
use serde_json::Value;

use super::ApiClient;
use crate::error::ApiError;

/// Outcome of asking for an evaluation's results.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsAvailability {
    Available(Value),
    /// The backend refused (403); the message is meant to be shown as-is.
    Unavailable(String),
}

/// Problem report about a question, filed from inside an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionReport {
    pub attempt_id: AttemptId,
    pub description: String,
    pub reason: String,
}

/// Read-mostly evaluation endpoints that sit outside the attempt lifecycle.
#[derive(Clone)]
pub struct CatalogService {
    client: ApiClient,
}

impl CatalogService {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// List every evaluation visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failures.
    pub async fn list_evaluations(&self, token: &str) -> Result<Vec<Evaluation>, ApiError> {
        let list: Option<Vec<Evaluation>> = self.client.get("evaluations/", token).await?;
        Ok(list.unwrap_or_default())
    }

    /// Evaluations the user still has to take.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failures.
    pub async fn pending_evaluations(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<Vec<Evaluation>, ApiError> {
        let list: Option<Vec<Evaluation>> = self
            .client
            .get(&format!("users/{user_id}/pending-evaluations/"), token)
            .await?;
        Ok(list.unwrap_or_default())
    }

    /// Fetch results, turning a 403 into a displayable `Unavailable`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for every failure other than `Forbidden`.
    pub async fn results(
        &self,
        evaluation_id: EvaluationId,
        token: &str,
    ) -> Result<ResultsAvailability, ApiError> {
        match self
            .client
            .get::<Value>(&format!("evaluations/{evaluation_id}/results/"), token)
            .await
        {
            Ok(results) => Ok(ResultsAvailability::Available(results)),
            Err(ApiError::Forbidden(detail)) => Ok(ResultsAvailability::Unavailable(detail)),
            Err(err) => Err(err),
        }
    }

    /// File a report against a question.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failures.
    pub async fn report_question(
        &self,
        question_id: QuestionId,
        report: &QuestionReport,
        token: &str,
    ) -> Result<(), ApiError> {
        let _ack: Value = self
            .client
            .post(&format!("questions/{question_id}/report/"), token, report)
            .await?;
        Ok(())
    }
}
