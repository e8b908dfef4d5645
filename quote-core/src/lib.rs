pub mod api;
pub mod calculations;
pub mod draft;
pub mod models;
pub mod wizard;

pub use api::repository::{ApiError, QuoteApi};
pub use draft::{DraftPersistence, DraftStore, StorageError};
pub use models::*;
