use async_trait::async_trait;
use aula_core::model::{
    Answers, Attempt, AttemptId, Evaluation, EvaluationId, SubmissionResult, TimeSync,
};
use serde::Serialize;
use serde_json::Value;

use super::ApiClient;
use crate::error::ApiError;

/// Backend operations an evaluation session depends on.
#[async_trait]
pub trait EvaluationApi: Send + Sync {
    /// Fetch the evaluation definition.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the evaluation does not exist.
    async fn evaluation(&self, id: EvaluationId, token: &str) -> Result<Evaluation, ApiError>;

    /// Fetch the caller's current attempt, if the backend has one.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failures.
    async fn current_attempt(
        &self,
        id: EvaluationId,
        token: &str,
    ) -> Result<Option<Attempt>, ApiError>;

    /// Ask the backend to open a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Server` when the backend rejects it (e.g. attempts exhausted).
    async fn start_attempt(&self, id: EvaluationId, token: &str) -> Result<Attempt, ApiError>;

    /// Report the local countdown and receive the authoritative one.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failures.
    async fn sync_time(
        &self,
        attempt_id: AttemptId,
        remaining_time: u32,
        token: &str,
    ) -> Result<TimeSync, ApiError>;

    /// Store the full answer map of an attempt.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failures.
    async fn save_answers(
        &self,
        attempt_id: AttemptId,
        answers: &Answers,
        token: &str,
    ) -> Result<(), ApiError>;

    /// Submit the attempt for grading.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failures.
    async fn submit(
        &self,
        evaluation_id: EvaluationId,
        attempt_id: AttemptId,
        answers: &Answers,
        token: &str,
    ) -> Result<SubmissionResult, ApiError>;
}

/// `EvaluationApi` over the REST backend.
#[derive(Clone)]
pub struct HttpEvaluationApi {
    client: ApiClient,
}

impl HttpEvaluationApi {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct AnswersBody<'a> {
    answers: &'a Answers,
}

#[derive(Serialize)]
struct SyncBody {
    remaining_time: u32,
}

#[async_trait]
impl EvaluationApi for HttpEvaluationApi {
    async fn evaluation(&self, id: EvaluationId, token: &str) -> Result<Evaluation, ApiError> {
        self.client.get(&format!("evaluations/{id}/"), token).await
    }

    async fn current_attempt(
        &self,
        id: EvaluationId,
        token: &str,
    ) -> Result<Option<Attempt>, ApiError> {
        match self
            .client
            .get::<Value>(&format!("evaluations/{id}/attempt/"), token)
            .await
        {
            Ok(payload) => attempt_from_payload(payload),
            Err(ApiError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn start_attempt(&self, id: EvaluationId, token: &str) -> Result<Attempt, ApiError> {
        self.client
            .request::<Attempt, ()>(
                reqwest::Method::POST,
                &format!("evaluations/{id}/start/"),
                Some(token),
                None,
            )
            .await
    }

    async fn sync_time(
        &self,
        attempt_id: AttemptId,
        remaining_time: u32,
        token: &str,
    ) -> Result<TimeSync, ApiError> {
        self.client
            .post(
                &format!("attempts/{attempt_id}/sync-time/"),
                token,
                &SyncBody { remaining_time },
            )
            .await
    }

    async fn save_answers(
        &self,
        attempt_id: AttemptId,
        answers: &Answers,
        token: &str,
    ) -> Result<(), ApiError> {
        let _ack: Value = self
            .client
            .post(
                &format!("attempts/{attempt_id}/save/"),
                token,
                &AnswersBody { answers },
            )
            .await?;
        Ok(())
    }

    async fn submit(
        &self,
        evaluation_id: EvaluationId,
        attempt_id: AttemptId,
        answers: &Answers,
        token: &str,
    ) -> Result<SubmissionResult, ApiError> {
        let result: Option<SubmissionResult> = self
            .client
            .post(
                &format!("evaluations/{evaluation_id}/submit/{attempt_id}/"),
                token,
                &AnswersBody { answers },
            )
            .await?;
        Ok(result.unwrap_or_default())
    }
}

/// The attempt endpoint answers with an attempt, `null`, an empty body or `{}`.
pub(crate) fn attempt_from_payload(payload: Value) -> Result<Option<Attempt>, ApiError> {
    match &payload {
        Value::Null => return Ok(None),
        Value::Object(map) if !map.contains_key("id") => return Ok(None),
        _ => {}
    }
    serde_json::from_value(payload)
        .map(Some)
        .map_err(|err| ApiError::MalformedResponse(err.to_string()))
}
