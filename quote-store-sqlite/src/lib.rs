mod decimal;
mod draft_store;
mod factory;
mod repository;

pub use draft_store::SqliteDraftStore;
pub use factory::SqliteBackendFactory;
pub use repository::SqliteRepository;
