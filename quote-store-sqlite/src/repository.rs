use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use quote_core::models::{
    CreatedQuote, InventoryItem, NewInventoryItem, NewService, NewServiceOption, NewTier,
    OptionFieldType, QuoteSubmission, Service, ServiceOption, Tier, UploadedFile,
};
use quote_core::{ApiError, QuoteApi};
use serde_json::Value;
use sqlx::{Row, sqlite::SqlitePool};
use tracing::{info, warn};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

/// Local backend that stores the catalog, uploads, quotes and inventory in
/// SQLite.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn database_error(e: sqlx::Error) -> ApiError {
    ApiError::Database(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn get<'r, T>(
    row: &'r sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<T, ApiError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| ApiError::Database(format!("Failed to get '{}': {}", column, e)))
}

fn json_list(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Vec<String>, ApiError> {
    let raw: String = get(row, column)?;
    serde_json::from_str(&raw)
        .map_err(|e| ApiError::Database(format!("Invalid JSON list in '{}': {}", column, e)))
}

fn row_to_service(row: &sqlx::sqlite::SqliteRow) -> Result<Service, ApiError> {
    Ok(Service {
        id: get(row, "id")?,
        slug: get(row, "slug")?,
        name: get(row, "name")?,
        description: get(row, "description")?,
        is_active: get(row, "is_active")?,
    })
}

fn row_to_service_option(row: &sqlx::sqlite::SqliteRow) -> Result<ServiceOption, ApiError> {
    let key: String = get(row, "option_key")?;

    let field_type_str: String = get(row, "field_type")?;
    let field_type = OptionFieldType::parse(&field_type_str).unwrap_or_else(|| {
        warn!(option = %key, field_type = %field_type_str, "unknown field type, using text");
        OptionFieldType::Text
    });

    // Pricing rules are best-effort: a malformed blob drops the rules, not the option.
    let impact_raw: Option<String> = get(row, "pricing_impact")?;
    let pricing_impact = impact_raw.and_then(|raw| match serde_json::from_str::<Value>(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(option = %key, %error, "ignoring unreadable pricing impact");
            None
        }
    });

    Ok(ServiceOption {
        id: get(row, "id")?,
        service_id: get(row, "service_id")?,
        label: get(row, "label")?,
        field_type,
        required: get(row, "required")?,
        choices: json_list(row, "choices")?,
        pricing_impact,
        key,
    })
}

fn row_to_tier(row: &sqlx::sqlite::SqliteRow) -> Result<Tier, ApiError> {
    Ok(Tier {
        id: get(row, "id")?,
        service_id: get(row, "service_id")?,
        name: get(row, "name")?,
        description: get(row, "description")?,
        price: get_optional_decimal(row, "price")?,
        features: json_list(row, "features")?,
        sort_order: get(row, "sort_order")?,
    })
}

fn row_to_inventory_item(row: &sqlx::sqlite::SqliteRow) -> Result<InventoryItem, ApiError> {
    Ok(InventoryItem {
        id: get(row, "id")?,
        sku: get(row, "sku")?,
        name: get(row, "name")?,
        unit: get(row, "unit")?,
        qty_on_hand: get_decimal(row, "qty_on_hand")?,
        reorder_point: get_decimal(row, "reorder_point")?,
        reorder_qty: get_decimal(row, "reorder_qty")?,
        cost_per_unit: get_decimal(row, "cost_per_unit")?,
        supplier: get(row, "supplier")?,
    })
}

const SERVICE_COLUMNS: &str = "id, slug, name, description, is_active";
const OPTION_COLUMNS: &str =
    "id, service_id, option_key, label, field_type, required, choices, pricing_impact";
const TIER_COLUMNS: &str = "id, service_id, name, description, price, features, sort_order";
const INVENTORY_COLUMNS: &str =
    "id, sku, name, unit, qty_on_hand, reorder_point, reorder_qty, cost_per_unit, supplier";

#[async_trait]
impl QuoteApi for SqliteRepository {
    async fn list_services(&self) -> Result<Vec<Service>, ApiError> {
        let rows = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE is_active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(row_to_service).collect()
    }

    async fn get_service(
        &self,
        id: i64,
    ) -> Result<Service, ApiError> {
        let row = sqlx::query(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?
            .ok_or(ApiError::NotFound)?;

        row_to_service(&row)
    }

    async fn get_service_by_slug(
        &self,
        slug: &str,
    ) -> Result<Service, ApiError> {
        let row = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?
        .ok_or(ApiError::NotFound)?;

        row_to_service(&row)
    }

    async fn create_service(
        &self,
        service: NewService,
    ) -> Result<Service, ApiError> {
        let result = sqlx::query("INSERT INTO services (slug, name, description) VALUES (?, ?, ?)")
            .bind(&service.slug)
            .bind(&service.name)
            .bind(&service.description)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::Rejected(format!("service '{}' already exists", service.slug))
                } else {
                    database_error(e)
                }
            })?;

        self.get_service(result.last_insert_rowid()).await
    }

    async fn list_service_options(
        &self,
        service_id: i64,
    ) -> Result<Vec<ServiceOption>, ApiError> {
        let rows = sqlx::query(&format!(
            "SELECT {OPTION_COLUMNS} FROM service_options WHERE service_id = ? ORDER BY id"
        ))
        .bind(service_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(row_to_service_option).collect()
    }

    async fn create_service_option(
        &self,
        option: NewServiceOption,
    ) -> Result<ServiceOption, ApiError> {
        let choices = serde_json::to_string(&option.choices)
            .map_err(|e| ApiError::Rejected(format!("invalid choices: {}", e)))?;
        let pricing_impact = option.pricing_impact.as_ref().map(Value::to_string);

        let result = sqlx::query(
            "INSERT INTO service_options
                (service_id, option_key, label, field_type, required, choices, pricing_impact)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(option.service_id)
        .bind(&option.key)
        .bind(&option.label)
        .bind(option.field_type.as_str())
        .bind(option.required)
        .bind(choices)
        .bind(pricing_impact)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Rejected(format!("option '{}' already exists", option.key))
            } else {
                database_error(e)
            }
        })?;

        let row = sqlx::query(&format!(
            "SELECT {OPTION_COLUMNS} FROM service_options WHERE id = ?"
        ))
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)?;

        row_to_service_option(&row)
    }

    async fn list_tiers(
        &self,
        service_id: i64,
    ) -> Result<Vec<Tier>, ApiError> {
        let rows = sqlx::query(&format!(
            "SELECT {TIER_COLUMNS} FROM tiers WHERE service_id = ? ORDER BY sort_order, id"
        ))
        .bind(service_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(row_to_tier).collect()
    }

    async fn create_tier(
        &self,
        tier: NewTier,
    ) -> Result<Tier, ApiError> {
        let features = serde_json::to_string(&tier.features)
            .map_err(|e| ApiError::Rejected(format!("invalid features: {}", e)))?;

        let result = sqlx::query(
            "INSERT INTO tiers (service_id, name, description, price, features, sort_order)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(tier.service_id)
        .bind(&tier.name)
        .bind(&tier.description)
        .bind(tier.price.map(decimal_to_text))
        .bind(features)
        .bind(tier.sort_order)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        let row = sqlx::query(&format!("SELECT {TIER_COLUMNS} FROM tiers WHERE id = ?"))
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)?;

        row_to_tier(&row)
    }

    async fn upload_file(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ApiError> {
        let size_bytes = bytes.len() as u64;

        let result = sqlx::query(
            "INSERT INTO uploaded_files (filename, content_type, size_bytes, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(filename)
        .bind(content_type)
        .bind(size_bytes as i64)
        .bind(bytes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(UploadedFile {
            id: result.last_insert_rowid(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size_bytes,
        })
    }

    async fn submit_quote(
        &self,
        submission: QuoteSubmission,
    ) -> Result<CreatedQuote, ApiError> {
        let tier_offered: Option<i64> =
            sqlx::query_scalar("SELECT id FROM tiers WHERE id = ? AND service_id = ?")
                .bind(submission.tier_id)
                .bind(submission.service_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;
        if tier_offered.is_none() {
            return Err(ApiError::Rejected(format!(
                "tier {} is not offered for service {}",
                submission.tier_id, submission.service_id
            )));
        }

        let project_details = serde_json::to_string(&submission.project_details)
            .map_err(|e| ApiError::Rejected(format!("invalid project details: {}", e)))?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let result = sqlx::query(
            "INSERT INTO quotes (service_id, tier_id, project_details, notes, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(submission.service_id)
        .bind(submission.tier_id)
        .bind(project_details)
        .bind(&submission.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;
        let quote_id = result.last_insert_rowid();

        for file_id in &submission.file_ids {
            let known: Option<i64> = sqlx::query_scalar("SELECT id FROM uploaded_files WHERE id = ?")
                .bind(file_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(database_error)?;
            if known.is_none() {
                // Dropping the transaction rolls the quote back.
                return Err(ApiError::Rejected(format!("unknown file {}", file_id)));
            }
            sqlx::query("INSERT OR IGNORE INTO quote_files (quote_id, file_id) VALUES (?, ?)")
                .bind(quote_id)
                .bind(file_id)
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)?;

        let created = CreatedQuote::new(quote_id, now);
        info!(reference = %created.reference, "quote stored");
        Ok(created)
    }

    async fn list_inventory(&self) -> Result<Vec<InventoryItem>, ApiError> {
        let rows = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_items ORDER BY sku"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(row_to_inventory_item).collect()
    }

    async fn upsert_inventory_item(
        &self,
        item: NewInventoryItem,
    ) -> Result<InventoryItem, ApiError> {
        sqlx::query(
            "INSERT INTO inventory_items
                (sku, name, unit, qty_on_hand, reorder_point, reorder_qty, cost_per_unit, supplier)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(sku) DO UPDATE SET
                name = excluded.name,
                unit = excluded.unit,
                qty_on_hand = excluded.qty_on_hand,
                reorder_point = excluded.reorder_point,
                reorder_qty = excluded.reorder_qty,
                cost_per_unit = excluded.cost_per_unit,
                supplier = excluded.supplier",
        )
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.unit)
        .bind(decimal_to_text(item.qty_on_hand))
        .bind(decimal_to_text(item.reorder_point))
        .bind(decimal_to_text(item.reorder_qty))
        .bind(decimal_to_text(item.cost_per_unit))
        .bind(&item.supplier)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_items WHERE sku = ?"
        ))
        .bind(&item.sku)
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)?;

        row_to_inventory_item(&row)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool).await;
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    async fn seed_service(repo: &SqliteRepository) -> (Service, Tier) {
        let service = repo
            .create_service(NewService {
                slug: "vehicle-wraps".to_string(),
                name: "Vehicle wraps".to_string(),
                description: Some("Full and partial wraps".to_string()),
            })
            .await
            .expect("Failed to create service");
        let tier = repo
            .create_tier(NewTier {
                service_id: service.id,
                name: "Partial".to_string(),
                description: None,
                price: Some(dec!(450.00)),
                features: vec!["Design proof".to_string(), "Install".to_string()],
                sort_order: 1,
            })
            .await
            .expect("Failed to create tier");
        (service, tier)
    }

    #[tokio::test]
    async fn test_create_and_find_service() {
        let repo = setup_test_db().await;
        let (service, _) = seed_service(&repo).await;

        let by_slug = repo.get_service_by_slug("vehicle-wraps").await.unwrap();
        let listed = repo.list_services().await.unwrap();

        assert_eq!(by_slug, service);
        assert_eq!(listed, vec![service]);
        assert!(by_slug.is_active);
    }

    #[tokio::test]
    async fn test_missing_service_is_not_found() {
        let repo = setup_test_db().await;

        let result = repo.get_service(404).await;

        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_rejected() {
        let repo = setup_test_db().await;
        seed_service(&repo).await;

        let result = repo
            .create_service(NewService {
                slug: "vehicle-wraps".to_string(),
                name: "Again".to_string(),
                description: None,
            })
            .await;

        assert!(matches!(result, Err(ApiError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_option_round_trip_keeps_pricing_impact() {
        let repo = setup_test_db().await;
        let (service, _) = seed_service(&repo).await;

        let created = repo
            .create_service_option(NewServiceOption {
                service_id: service.id,
                key: "coverage".to_string(),
                label: "Coverage".to_string(),
                field_type: OptionFieldType::Select,
                required: true,
                choices: vec!["half".to_string(), "full".to_string()],
                pricing_impact: Some(json!({"full": 600})),
            })
            .await
            .unwrap();

        let options = repo.list_service_options(service.id).await.unwrap();
        assert_eq!(options, vec![created]);
        assert_eq!(options[0].pricing_impact, Some(json!({"full": 600})));
        assert_eq!(options[0].field_type, OptionFieldType::Select);
        assert!(options[0].required);
    }

    #[tokio::test]
    async fn test_malformed_pricing_impact_is_dropped() {
        let repo = setup_test_db().await;
        let (service, _) = seed_service(&repo).await;
        sqlx::query(
            "INSERT INTO service_options (service_id, option_key, label, field_type, pricing_impact)
             VALUES (?, 'colour', 'Colour', 'swatch', '{broken')",
        )
        .bind(service.id)
        .execute(repo.pool())
        .await
        .unwrap();

        let options = repo.list_service_options(service.id).await.unwrap();

        assert_eq!(options.len(), 1);
        assert_eq!(options[0].pricing_impact, None);
        assert_eq!(options[0].field_type, OptionFieldType::Text);
    }

    #[tokio::test]
    async fn test_tier_price_keeps_scale() {
        let repo = setup_test_db().await;
        let (service, tier) = seed_service(&repo).await;

        let tiers = repo.list_tiers(service.id).await.unwrap();

        assert_eq!(tiers, vec![tier]);
        assert_eq!(tiers[0].price.map(|p| p.to_string()), Some("450.00".to_string()));
    }

    #[tokio::test]
    async fn test_submit_quote_links_files() {
        let repo = setup_test_db().await;
        let (service, tier) = seed_service(&repo).await;
        let file = repo
            .upload_file("van.png", "image/png", vec![7; 64])
            .await
            .unwrap();

        let created = repo
            .submit_quote(QuoteSubmission {
                service_id: service.id,
                tier_id: tier.id,
                project_details: BTreeMap::from([("coverage".to_string(), json!("full"))]),
                file_ids: vec![file.id],
                notes: "blue van".to_string(),
            })
            .await
            .unwrap();

        let linked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quote_files WHERE quote_id = ?")
            .bind(created.id)
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(linked, 1);
        assert_eq!(file.size_bytes, 64);
    }

    #[tokio::test]
    async fn test_submit_with_unknown_file_rolls_back() {
        let repo = setup_test_db().await;
        let (service, tier) = seed_service(&repo).await;

        let result = repo
            .submit_quote(QuoteSubmission {
                service_id: service.id,
                tier_id: tier.id,
                project_details: BTreeMap::new(),
                file_ids: vec![999],
                notes: String::new(),
            })
            .await;

        assert!(matches!(result, Err(ApiError::Rejected(_))));
        let quotes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quotes")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(quotes, 0);
    }

    #[tokio::test]
    async fn test_submit_with_foreign_tier_is_rejected() {
        let repo = setup_test_db().await;
        let (service, tier) = seed_service(&repo).await;

        let result = repo
            .submit_quote(QuoteSubmission {
                service_id: service.id + 1,
                tier_id: tier.id,
                project_details: BTreeMap::new(),
                file_ids: vec![],
                notes: String::new(),
            })
            .await;

        assert!(matches!(result, Err(ApiError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_upsert_inventory_updates_existing_sku() {
        let repo = setup_test_db().await;
        let item = NewInventoryItem {
            sku: "INK-CY".to_string(),
            name: "Cyan ink".to_string(),
            unit: "litre".to_string(),
            qty_on_hand: dec!(3.5),
            reorder_point: dec!(2),
            reorder_qty: dec!(5),
            cost_per_unit: dec!(48.90),
            supplier: Some("InkCo".to_string()),
        };
        let first = repo.upsert_inventory_item(item.clone()).await.unwrap();

        let second = repo
            .upsert_inventory_item(NewInventoryItem {
                qty_on_hand: dec!(1.25),
                ..item
            })
            .await
            .unwrap();

        let items = repo.list_inventory().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(items[0].qty_on_hand, dec!(1.25));
        assert_eq!(items[0].cost_per_unit.to_string(), "48.90");
    }
}
