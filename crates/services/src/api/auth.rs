use aula_core::model::{SessionUser, TokenPair};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::error::ApiError;

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct AccessToken {
    access: String,
}

/// Token issuance and identity endpoints.
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for an access/refresh pair.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for rejected credentials.
    pub async fn obtain_token(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        self.client
            .request_anonymous(
                Method::POST,
                "token/",
                Some(&Credentials { username, password }),
            )
            .await
    }

    /// Trade a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` once the refresh token has expired.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let token: AccessToken = self
            .client
            .request_anonymous(
                Method::POST,
                "token/refresh/",
                Some(&RefreshBody {
                    refresh: refresh_token,
                }),
            )
            .await?;
        Ok(token.access)
    }

    /// Fetch the user the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failures.
    pub async fn current_user(&self, token: &str) -> Result<SessionUser, ApiError> {
        self.client.get("user/", token).await
    }
}
