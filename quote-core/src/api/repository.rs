use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CreatedQuote, InventoryItem, NewInventoryItem, NewService, NewServiceOption, NewTier,
    QuoteSubmission, Service, ServiceOption, Tier, UploadedFile,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Record not found")]
    NotFound,

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// The backend collaborator the storefront and console talk to.
///
/// Read methods serve the wizard's catalogs; the write methods accept file
/// uploads and quote submissions. The catalog and inventory inserts are used by
/// the data loader.
#[async_trait]
pub trait QuoteApi: Send + Sync {
    // Services
    async fn list_services(&self) -> Result<Vec<Service>, ApiError>;
    async fn get_service(&self, id: i64) -> Result<Service, ApiError>;
    async fn get_service_by_slug(&self, slug: &str) -> Result<Service, ApiError>;
    async fn create_service(&self, service: NewService) -> Result<Service, ApiError>;

    // Service options
    async fn list_service_options(&self, service_id: i64)
    -> Result<Vec<ServiceOption>, ApiError>;
    async fn create_service_option(
        &self,
        option: NewServiceOption,
    ) -> Result<ServiceOption, ApiError>;

    // Tiers
    async fn list_tiers(&self, service_id: i64) -> Result<Vec<Tier>, ApiError>;
    async fn create_tier(&self, tier: NewTier) -> Result<Tier, ApiError>;

    // Files
    async fn upload_file(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ApiError>;

    // Quotes
    async fn submit_quote(&self, submission: QuoteSubmission) -> Result<CreatedQuote, ApiError>;

    // Inventory
    async fn list_inventory(&self) -> Result<Vec<InventoryItem>, ApiError>;

    /// Inserts an item, or replaces the stored one with the same SKU.
    async fn upsert_inventory_item(
        &self,
        item: NewInventoryItem,
    ) -> Result<InventoryItem, ApiError>;
}
