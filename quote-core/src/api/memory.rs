//! In-process backend used for previews and tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::factory::{Backend, BackendConfig, BackendFactory};
use super::repository::{ApiError, QuoteApi};
use crate::draft::MemoryDraftStore;
use crate::models::{
    CreatedQuote, InventoryItem, NewInventoryItem, NewService, NewServiceOption, NewTier,
    QuoteSubmission, Service, ServiceOption, Tier, UploadedFile,
};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    services: Vec<Service>,
    options: Vec<ServiceOption>,
    tiers: Vec<Tier>,
    files: Vec<UploadedFile>,
    quotes: Vec<(CreatedQuote, QuoteSubmission)>,
    inventory: Vec<InventoryItem>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// [`QuoteApi`] backed by plain vectors behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryQuoteApi {
    state: Mutex<MemoryState>,
}

impl MemoryQuoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submissions accepted so far, oldest first.
    pub fn submitted_quotes(&self) -> Result<Vec<QuoteSubmission>, ApiError> {
        Ok(self
            .lock()?
            .quotes
            .iter()
            .map(|(_, submission)| submission.clone())
            .collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, ApiError> {
        self.state
            .lock()
            .map_err(|_| ApiError::Database("memory backend lock poisoned".to_string()))
    }
}

#[async_trait]
impl QuoteApi for MemoryQuoteApi {
    async fn list_services(&self) -> Result<Vec<Service>, ApiError> {
        Ok(self
            .lock()?
            .services
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    async fn get_service(
        &self,
        id: i64,
    ) -> Result<Service, ApiError> {
        self.lock()?
            .services
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn get_service_by_slug(
        &self,
        slug: &str,
    ) -> Result<Service, ApiError> {
        self.lock()?
            .services
            .iter()
            .find(|s| s.slug == slug)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create_service(
        &self,
        service: NewService,
    ) -> Result<Service, ApiError> {
        let mut state = self.lock()?;
        if state.services.iter().any(|s| s.slug == service.slug) {
            return Err(ApiError::Rejected(format!(
                "service '{}' already exists",
                service.slug
            )));
        }
        let created = Service {
            id: state.allocate_id(),
            slug: service.slug,
            name: service.name,
            description: service.description,
            is_active: true,
        };
        state.services.push(created.clone());
        Ok(created)
    }

    async fn list_service_options(
        &self,
        service_id: i64,
    ) -> Result<Vec<ServiceOption>, ApiError> {
        Ok(self
            .lock()?
            .options
            .iter()
            .filter(|o| o.service_id == service_id)
            .cloned()
            .collect())
    }

    async fn create_service_option(
        &self,
        option: NewServiceOption,
    ) -> Result<ServiceOption, ApiError> {
        let mut state = self.lock()?;
        if !state.services.iter().any(|s| s.id == option.service_id) {
            return Err(ApiError::NotFound);
        }
        let created = ServiceOption {
            id: state.allocate_id(),
            service_id: option.service_id,
            key: option.key,
            label: option.label,
            field_type: option.field_type,
            required: option.required,
            choices: option.choices,
            pricing_impact: option.pricing_impact,
        };
        state.options.push(created.clone());
        Ok(created)
    }

    async fn list_tiers(
        &self,
        service_id: i64,
    ) -> Result<Vec<Tier>, ApiError> {
        let mut tiers: Vec<_> = self
            .lock()?
            .tiers
            .iter()
            .filter(|t| t.service_id == service_id)
            .cloned()
            .collect();
        tiers.sort_by_key(|t| (t.sort_order, t.id));
        Ok(tiers)
    }

    async fn create_tier(
        &self,
        tier: NewTier,
    ) -> Result<Tier, ApiError> {
        let mut state = self.lock()?;
        if !state.services.iter().any(|s| s.id == tier.service_id) {
            return Err(ApiError::NotFound);
        }
        let created = Tier {
            id: state.allocate_id(),
            service_id: tier.service_id,
            name: tier.name,
            description: tier.description,
            price: tier.price,
            features: tier.features,
            sort_order: tier.sort_order,
        };
        state.tiers.push(created.clone());
        Ok(created)
    }

    async fn upload_file(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ApiError> {
        let mut state = self.lock()?;
        let uploaded = UploadedFile {
            id: state.allocate_id(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
        };
        state.files.push(uploaded.clone());
        Ok(uploaded)
    }

    async fn submit_quote(
        &self,
        submission: QuoteSubmission,
    ) -> Result<CreatedQuote, ApiError> {
        let mut state = self.lock()?;
        let tier_matches = state
            .tiers
            .iter()
            .any(|t| t.id == submission.tier_id && t.service_id == submission.service_id);
        if !tier_matches {
            return Err(ApiError::Rejected(format!(
                "tier {} is not offered for service {}",
                submission.tier_id, submission.service_id
            )));
        }
        if let Some(missing) = submission
            .file_ids
            .iter()
            .find(|id| !state.files.iter().any(|f| f.id == **id))
        {
            return Err(ApiError::Rejected(format!("unknown file {missing}")));
        }

        let created = CreatedQuote::new(state.allocate_id(), Utc::now());
        info!(reference = %created.reference, "quote stored in memory backend");
        state.quotes.push((created.clone(), submission));
        Ok(created)
    }

    async fn list_inventory(&self) -> Result<Vec<InventoryItem>, ApiError> {
        let mut items = self.lock()?.inventory.clone();
        items.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(items)
    }

    async fn upsert_inventory_item(
        &self,
        item: NewInventoryItem,
    ) -> Result<InventoryItem, ApiError> {
        let mut state = self.lock()?;
        let id = match state.inventory.iter().position(|i| i.sku == item.sku) {
            Some(index) => state.inventory.remove(index).id,
            None => state.allocate_id(),
        };
        let stored = InventoryItem {
            id,
            sku: item.sku,
            name: item.name,
            unit: item.unit,
            qty_on_hand: item.qty_on_hand,
            reorder_point: item.reorder_point,
            reorder_qty: item.reorder_qty,
            cost_per_unit: item.cost_per_unit,
            supplier: item.supplier,
        };
        state.inventory.push(stored.clone());
        Ok(stored)
    }
}

/// [`BackendFactory`] for the `"memory"` backend. The connection string is
/// ignored; every call yields a fresh, empty backend.
pub struct MemoryBackendFactory;

#[async_trait]
impl BackendFactory for MemoryBackendFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &BackendConfig,
    ) -> Result<Backend, ApiError> {
        Ok(Backend {
            api: Arc::new(MemoryQuoteApi::new()),
            drafts: Arc::new(MemoryDraftStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::OptionFieldType;

    async fn seeded() -> (MemoryQuoteApi, Service, Tier) {
        let api = MemoryQuoteApi::new();
        let service = api
            .create_service(NewService {
                slug: "banners".to_string(),
                name: "Banners".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let tier = api
            .create_tier(NewTier {
                service_id: service.id,
                name: "Basic".to_string(),
                description: None,
                price: Some(dec!(90.00)),
                features: vec![],
                sort_order: 1,
            })
            .await
            .unwrap();
        (api, service, tier)
    }

    #[tokio::test]
    async fn duplicate_service_slug_is_rejected() {
        let (api, _, _) = seeded().await;

        let result = api
            .create_service(NewService {
                slug: "banners".to_string(),
                name: "Banners again".to_string(),
                description: None,
            })
            .await;

        assert!(matches!(result, Err(ApiError::Rejected(_))));
    }

    #[tokio::test]
    async fn options_are_scoped_to_their_service() {
        let (api, service, _) = seeded().await;
        api.create_service_option(NewServiceOption {
            service_id: service.id,
            key: "size".to_string(),
            label: "Size".to_string(),
            field_type: OptionFieldType::Select,
            required: true,
            choices: vec!["A1".to_string()],
            pricing_impact: None,
        })
        .await
        .unwrap();

        assert_eq!(api.list_service_options(service.id).await.unwrap().len(), 1);
        assert!(api.list_service_options(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_with_foreign_tier_is_rejected() {
        let (api, service, _) = seeded().await;

        let result = api
            .submit_quote(QuoteSubmission {
                service_id: service.id,
                tier_id: 12345,
                project_details: BTreeMap::new(),
                file_ids: vec![],
                notes: String::new(),
            })
            .await;

        assert!(matches!(result, Err(ApiError::Rejected(_))));
        assert!(api.submitted_quotes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_records_the_quote() {
        let (api, service, tier) = seeded().await;
        let file = api
            .upload_file("art.pdf", "application/pdf", vec![0; 16])
            .await
            .unwrap();

        let created = api
            .submit_quote(QuoteSubmission {
                service_id: service.id,
                tier_id: tier.id,
                project_details: BTreeMap::new(),
                file_ids: vec![file.id],
                notes: "thanks".to_string(),
            })
            .await
            .unwrap();

        assert!(created.reference.starts_with("Q-"));
        assert_eq!(file.size_bytes, 16);
        assert_eq!(api.submitted_quotes().unwrap()[0].notes, "thanks");
    }

    #[tokio::test]
    async fn upsert_replaces_by_sku() {
        let api = MemoryQuoteApi::new();
        let item = NewInventoryItem {
            sku: "VIN-001".to_string(),
            name: "Vinyl".to_string(),
            unit: "roll".to_string(),
            qty_on_hand: dec!(4),
            reorder_point: dec!(2),
            reorder_qty: dec!(6),
            cost_per_unit: dec!(35.00),
            supplier: None,
        };
        let first = api.upsert_inventory_item(item.clone()).await.unwrap();

        let second = api
            .upsert_inventory_item(NewInventoryItem {
                qty_on_hand: dec!(1),
                ..item
            })
            .await
            .unwrap();

        let items = api.list_inventory().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(items[0].qty_on_hand, dec!(1));
    }
}
