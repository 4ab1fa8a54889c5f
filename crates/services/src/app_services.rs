use std::sync::Arc;

use aula_core::model::{Evaluation, StartEligibility};
use storage::LocalAttemptCache;
use storage::repository::Storage;

use crate::Clock;
use crate::api::{ApiClient, AuthApi, CatalogService, EvaluationApi, HttpEvaluationApi};
use crate::config::{ApiConfig, SessionConfig};
use crate::error::AppServicesError;
use crate::evaluation::EvaluationSession;
use crate::session_state::SessionState;

/// Assembles app-facing services over one storage backend and one API client.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    session_state: Arc<SessionState>,
    evaluations: Arc<dyn EvaluationApi>,
    catalog: Arc<CatalogService>,
    auth: Arc<AuthApi>,
    session_config: SessionConfig,
    clock: Clock,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or HTTP client
    /// construction fails.
    pub async fn new_sqlite(
        clock: Clock,
        db_url: &str,
        api_config: &ApiConfig,
        session_config: SessionConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::with_storage(clock, storage, api_config, session_config).await
    }

    /// Build services that keep client state in memory only.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the HTTP client cannot be built.
    pub async fn in_memory(
        clock: Clock,
        api_config: &ApiConfig,
        session_config: SessionConfig,
    ) -> Result<Self, AppServicesError> {
        Self::with_storage(clock, Storage::in_memory(), api_config, session_config).await
    }

    async fn with_storage(
        clock: Clock,
        storage: Storage,
        api_config: &ApiConfig,
        session_config: SessionConfig,
    ) -> Result<Self, AppServicesError> {
        let client = ApiClient::new(api_config)?;
        let session_state = Arc::new(SessionState::restore(Arc::clone(&storage.local)).await);
        let evaluations: Arc<dyn EvaluationApi> =
            Arc::new(HttpEvaluationApi::new(client.clone()));
        let catalog = Arc::new(CatalogService::new(client.clone()));
        let auth = Arc::new(AuthApi::new(client));

        Ok(Self {
            storage,
            session_state,
            evaluations,
            catalog,
            auth,
            session_config,
            clock,
        })
    }

    /// A fresh session, one per evaluation page.
    #[must_use]
    pub fn new_evaluation_session(&self) -> EvaluationSession {
        EvaluationSession::new(
            Arc::clone(&self.evaluations),
            self.attempt_cache(),
            self.session_config,
        )
    }

    /// Whether `evaluation` can be started right now.
    #[must_use]
    pub fn start_eligibility(&self, evaluation: &Evaluation) -> StartEligibility {
        evaluation.start_eligibility(self.clock.now())
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn attempt_cache(&self) -> LocalAttemptCache {
        LocalAttemptCache::new(Arc::clone(&self.storage.local))
    }

    #[must_use]
    pub fn session_state(&self) -> Arc<SessionState> {
        Arc::clone(&self.session_state)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthApi> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn evaluations(&self) -> Arc<dyn EvaluationApi> {
        Arc::clone(&self.evaluations)
    }
}
