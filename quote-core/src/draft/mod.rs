//! Draft persistence for the quote wizard.
//!
//! The whole [`crate::models::QuoteDraft`] is stored as one JSON blob under a
//! fixed key in a key-value [`DraftStore`], overwritten on every change.

mod memory;
mod persistence;
mod store;

pub use memory::MemoryDraftStore;
pub use persistence::{DRAFT_STORAGE_KEY, DraftError, DraftPersistence};
pub use store::{DraftStore, StorageError};
