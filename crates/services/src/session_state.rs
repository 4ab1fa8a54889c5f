//! Access token and signed-in user, persisted to durable client storage.

use std::sync::Arc;

use aula_core::model::{SessionUser, TokenPair};
use storage::repository::KeyValueStore;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::AuthApi;
use crate::error::AuthError;
use crate::store::Store;

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const USER_KEY: &str = "user";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<SessionUser>,
}

impl AuthSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Authentication context, constructed once by the composition root and
/// passed to whoever needs a token.
pub struct SessionState {
    storage: Arc<dyn KeyValueStore>,
    state: Store<AuthSnapshot>,
}

impl SessionState {
    /// Rebuild the session from storage. Unreadable entries are logged and
    /// treated as signed out.
    pub async fn restore(storage: Arc<dyn KeyValueStore>) -> Self {
        let access_token = read_key(storage.as_ref(), ACCESS_TOKEN_KEY)
            .await
            .filter(|token| !token.trim().is_empty());
        let refresh_token = read_key(storage.as_ref(), REFRESH_TOKEN_KEY).await;
        let user = read_key(storage.as_ref(), USER_KEY)
            .await
            .and_then(|raw| match serde_json::from_str::<SessionUser>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!(error = %err, "discarding unreadable stored user");
                    None
                }
            });

        Self {
            storage,
            state: Store::new(AuthSnapshot {
                access_token,
                refresh_token,
                user,
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.state.with(|s| s.access_token.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.with(AuthSnapshot::is_authenticated)
    }

    /// Persist a fresh sign-in and publish it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if persisting fails. The in-memory state is
    /// left unchanged and the persisted keys are removed, so a restart comes
    /// back signed out rather than half signed in.
    pub async fn login(&self, tokens: TokenPair, user: SessionUser) -> Result<(), AuthError> {
        let encoded_user = encode_user(&user)?;
        if let Err(err) = self.persist_login(&tokens, &encoded_user).await {
            warn!(error = %err, "failed to persist sign-in, discarding stored session");
            self.discard_persisted().await;
            return Err(err);
        }

        info!(user_id = %user.id, "signed in");
        self.state.set(AuthSnapshot {
            access_token: Some(tokens.access),
            refresh_token: tokens.refresh,
            user: Some(user),
        });
        Ok(())
    }

    /// Forget the session. Memory is cleared first so a storage failure never
    /// leaves the user signed in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the persisted keys cannot be removed.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.state.set(AuthSnapshot::default());
        self.storage.remove(ACCESS_TOKEN_KEY).await?;
        self.storage.remove(REFRESH_TOKEN_KEY).await?;
        self.storage.remove(USER_KEY).await?;
        info!("signed out");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the user cannot be persisted.
    pub async fn set_user(&self, user: SessionUser) -> Result<(), AuthError> {
        self.storage.set(USER_KEY, &encode_user(&user)?).await?;
        self.state.update(|s| s.user = Some(user));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the token cannot be persisted.
    pub async fn set_access_token(&self, token: String) -> Result<(), AuthError> {
        self.storage.set(ACCESS_TOKEN_KEY, &token).await?;
        self.state.update(|s| s.access_token = Some(token));
        Ok(())
    }

    /// Sign in with credentials: obtain tokens, fetch the user, persist both.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Api` for rejected credentials or request failures.
    pub async fn sign_in(
        &self,
        api: &AuthApi,
        username: &str,
        password: &str,
    ) -> Result<SessionUser, AuthError> {
        let tokens = api.obtain_token(username, password).await?;
        let user = api.current_user(&tokens.access).await?;
        self.login(tokens, user.clone()).await?;
        Ok(user)
    }

    /// Rotate the access token using the stored refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoRefreshToken` when none is stored and
    /// `AuthError::Api` when the backend refuses the refresh.
    pub async fn refresh_access(&self, api: &AuthApi) -> Result<String, AuthError> {
        let refresh = self
            .state
            .with(|s| s.refresh_token.clone())
            .ok_or(AuthError::NoRefreshToken)?;
        let access = api.refresh(&refresh).await?;
        self.set_access_token(access.clone()).await?;
        Ok(access)
    }
}

impl SessionState {
    async fn persist_login(&self, tokens: &TokenPair, encoded_user: &str) -> Result<(), AuthError> {
        self.storage.set(USER_KEY, encoded_user).await?;
        match tokens.refresh.as_deref() {
            Some(refresh) => self.storage.set(REFRESH_TOKEN_KEY, refresh).await?,
            None => self.storage.remove(REFRESH_TOKEN_KEY).await?,
        }
        // last: a stored access token is what restore treats as signed in
        self.storage.set(ACCESS_TOKEN_KEY, &tokens.access).await?;
        Ok(())
    }

    async fn discard_persisted(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.storage.remove(key).await {
                warn!(key, error = %err, "failed to remove session key");
            }
        }
    }
}

async fn read_key(storage: &dyn KeyValueStore, key: &str) -> Option<String> {
    match storage.get(key).await {
        Ok(value) => value,
        Err(err) => {
            warn!(key, error = %err, "failed to read session key");
            None
        }
    }
}

fn encode_user(user: &SessionUser) -> Result<String, AuthError> {
    serde_json::to_string(user).map_err(|err| {
        AuthError::Storage(storage::repository::StorageError::Serialization(
            err.to_string(),
        ))
    })
}
