#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod session_state;
pub mod store;

pub use aula_core::Clock;

pub use api::{ApiClient, AuthApi, CatalogService, EvaluationApi, HttpEvaluationApi};
pub use app_services::AppServices;
pub use config::{ApiConfig, SessionConfig};
pub use error::{ApiError, AppServicesError, AuthError, EvaluationSessionError};
pub use evaluation::{EvaluationSession, SessionPhase, SessionSnapshot};
pub use session_state::{AuthSnapshot, SessionState};
pub use store::Store;
