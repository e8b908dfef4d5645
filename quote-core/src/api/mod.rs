pub mod factory;
pub mod memory;
pub mod repository;

pub use factory::{Backend, BackendConfig, BackendFactory, BackendRegistry};
pub use memory::{MemoryBackendFactory, MemoryQuoteApi};
pub use repository::{ApiError, QuoteApi};
