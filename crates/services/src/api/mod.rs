//! Authenticated JSON requests against the REST backend.

mod auth;
mod catalog;
mod evaluations;

pub use auth::AuthApi;
pub use catalog::{CatalogService, QuestionReport, ResultsAvailability};
pub use evaluations::{EvaluationApi, HttpEvaluationApi};

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Thin client over `reqwest` that normalizes backend failures into `ApiError`.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url().to_owned(),
        })
    }

    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Issue a bearer-authenticated request and decode the JSON response.
    ///
    /// An empty 2xx body decodes as JSON `null`, so `Option<T>` and `Value`
    /// targets accept it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without touching the network when
    /// `token` is absent or blank, and the mapped `ApiError` for any
    /// non-success status, transport failure or undecodable body.
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)?;
        let builder = self
            .client
            .request(method, self.url(endpoint))
            .header(AUTHORIZATION, bearer(token));
        self.execute(builder, endpoint, body).await
    }

    /// Same as `request` but without credentials, for the token endpoints.
    ///
    /// # Errors
    ///
    /// Returns the mapped `ApiError` for any non-success status, transport
    /// failure or undecodable body.
    pub async fn request_anonymous<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.client.request(method, self.url(endpoint));
        self.execute(builder, endpoint, body).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        token: &str,
    ) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, endpoint, Some(token), None)
            .await
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post<T, B>(&self, endpoint: &str, token: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, endpoint, Some(token), Some(body))
            .await
    }

    async fn execute<T, B>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(endpoint, status = status.as_u16(), bytes = text.len(), "api response");

        check_status(status, &text)?;
        decode_body(&text)
    }
}

/// `Authorization` header value; tokens that already carry the scheme are kept.
pub(crate) fn bearer(token: &str) -> String {
    if token.starts_with("Bearer ") {
        token.to_owned()
    } else {
        format!("Bearer {token}")
    }
}

pub(crate) fn check_status(status: StatusCode, body: &str) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::FORBIDDEN => Err(ApiError::Forbidden(error_detail(status, body))),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        _ => Err(ApiError::Server {
            status,
            detail: error_detail(status, body),
        }),
    }
}

pub(crate) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|err| ApiError::MalformedResponse(err.to_string()))
}

/// Prefer the backend's `detail` message, then the raw body, then the status reason.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(detail) = map.get("detail").and_then(Value::as_str) {
            return detail.to_owned();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('<') {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned()
    } else {
        trimmed.chars().take(200).collect()
    }
}
