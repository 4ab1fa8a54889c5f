//! Best-effort shadow copy of in-progress answers, keyed by evaluation.
//!
//! The cache is never the source of truth. Every failure is logged and
//! swallowed so that a full or broken local store cannot interrupt an attempt.

use std::sync::Arc;

use aula_core::model::{EvaluationId, LocalCacheEntry};
use tracing::{debug, warn};

use crate::repository::KeyValueStore;

const KEY_PREFIX: &str = "evaluation_attempt";

#[derive(Clone)]
pub struct LocalAttemptCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocalAttemptCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn key_for(evaluation_id: EvaluationId) -> String {
        format!("{KEY_PREFIX}:{evaluation_id}")
    }

    /// Overwrite the entry for `evaluation_id`.
    pub async fn save(&self, evaluation_id: EvaluationId, entry: &LocalCacheEntry) {
        let encoded = match serde_json::to_string(entry) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(%evaluation_id, error = %err, "failed to encode local attempt cache entry");
                return;
            }
        };
        match self.store.set(&Self::key_for(evaluation_id), &encoded).await {
            Ok(()) => debug!(%evaluation_id, answers = entry.answers.len(), "cached attempt locally"),
            Err(err) => warn!(%evaluation_id, error = %err, "failed to write local attempt cache"),
        }
    }

    /// Read the entry for `evaluation_id`, treating unreadable data as absent.
    pub async fn load(&self, evaluation_id: EvaluationId) -> Option<LocalCacheEntry> {
        let raw = match self.store.get(&Self::key_for(evaluation_id)).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(%evaluation_id, error = %err, "failed to read local attempt cache");
                return None;
            }
        };
        match serde_json::from_str::<LocalCacheEntry>(&raw) {
            Ok(entry) if entry.evaluation_id == evaluation_id => Some(entry),
            Ok(entry) => {
                warn!(
                    %evaluation_id,
                    stored = %entry.evaluation_id,
                    "local attempt cache entry belongs to another evaluation"
                );
                None
            }
            Err(err) => {
                warn!(%evaluation_id, error = %err, "discarding corrupt local attempt cache entry");
                None
            }
        }
    }

    pub async fn clear(&self, evaluation_id: EvaluationId) {
        if let Err(err) = self.store.remove(&Self::key_for(evaluation_id)).await {
            warn!(%evaluation_id, error = %err, "failed to clear local attempt cache");
        }
    }
}
