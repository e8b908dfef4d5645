use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::store::{DraftStore, StorageError};
use crate::models::QuoteDraft;

/// Storage key under which the wizard draft is kept.
pub const DRAFT_STORAGE_KEY: &str = "quote_wizard_draft";

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("could not serialize draft: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Saves, restores and clears the wizard draft in a [`DraftStore`].
#[derive(Clone)]
pub struct DraftPersistence {
    store: Arc<dyn DraftStore>,
}

impl DraftPersistence {
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store }
    }

    /// Overwrites the stored draft with `draft`.
    pub async fn save_draft(
        &self,
        draft: &QuoteDraft,
    ) -> Result<(), DraftError> {
        let blob = serde_json::to_string(draft)?;
        self.store.set(DRAFT_STORAGE_KEY, &blob).await?;
        debug!(bytes = blob.len(), step = %draft.current_step, "draft saved");
        Ok(())
    }

    /// Restores the stored draft.
    ///
    /// Never fails: a missing entry, unreadable storage, or a blob that does
    /// not parse as a draft all yield `None` so the wizard starts fresh.
    pub async fn load_draft(&self) -> Option<QuoteDraft> {
        let blob = match self.store.get(DRAFT_STORAGE_KEY).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(error) => {
                warn!(%error, "draft storage unreadable, starting fresh");
                return None;
            }
        };

        match serde_json::from_str::<QuoteDraft>(&blob) {
            Ok(draft) => {
                debug!(step = %draft.current_step, "draft restored");
                Some(draft)
            }
            Err(error) => {
                warn!(%error, "discarding unreadable draft, starting fresh");
                None
            }
        }
    }

    /// Removes the stored draft. Only call after the backend acknowledged a
    /// submission, or when the customer explicitly discards the draft.
    pub async fn clear_draft(&self) -> Result<(), DraftError> {
        self.store.remove(DRAFT_STORAGE_KEY).await?;
        debug!("draft cleared");
        Ok(())
    }
}
