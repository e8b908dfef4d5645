pub mod catalog_loader;
pub mod inventory_loader;

pub use catalog_loader::{CatalogFile, CatalogLoader, CatalogLoaderError, CatalogSummary};
pub use inventory_loader::{InventoryLoader, InventoryLoaderError, InventoryRecord};
