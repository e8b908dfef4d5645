//! Integration tests for catalog and inventory loading against SQLite, and a
//! full wizard run on the loaded catalog.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use quote_core::calculations::{PricingCalculator, reorder_suggestions, summarize_stock};
use quote_core::wizard::{PendingUpload, WizardSession, WizardStep};
use quote_core::{DraftStore, QuoteApi, StockStatus};
use quote_data::{CatalogLoader, InventoryLoader};
use quote_store_sqlite::{SqliteDraftStore, SqliteRepository};
use rust_decimal_macros::dec;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

const CATALOG: &str = include_str!("../test-data/catalog.toml");
const INVENTORY_CSV: &str = include_str!("../test-data/inventory.csv");

async fn setup_test_db() -> (Arc<SqliteRepository>, Arc<SqliteDraftStore>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool.clone()).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    (Arc::new(repo), Arc::new(SqliteDraftStore::new(pool)))
}

async fn load_catalog(repo: &SqliteRepository) {
    let catalog = CatalogLoader::parse(CATALOG).expect("Failed to parse catalog");
    CatalogLoader::load(repo, &catalog)
        .await
        .expect("Failed to load catalog");
}

// =========================================================================
// Inventory
// =========================================================================

#[tokio::test]
async fn test_load_inventory_and_summarize() {
    let (repo, _) = setup_test_db().await;
    let records = InventoryLoader::parse(INVENTORY_CSV.as_bytes()).expect("Failed to parse CSV");

    let written = InventoryLoader::load(repo.as_ref(), &records)
        .await
        .expect("Failed to load inventory");

    assert_eq!(written, 6);
    let items = repo.list_inventory().await.unwrap();
    let summary = summarize_stock(&items);
    assert_eq!(summary.total, 6);
    assert_eq!(summary.count(StockStatus::InStock), 4);
    assert_eq!(summary.count(StockStatus::LowStock), 1);
    assert_eq!(summary.count(StockStatus::OutOfStock), 1);
    assert_eq!(summary.stock_value, dec!(1724.75));
}

#[tokio::test]
async fn test_reorder_point_boundary_is_low_stock() {
    let (repo, _) = setup_test_db().await;
    let records = InventoryLoader::parse(INVENTORY_CSV.as_bytes()).unwrap();
    InventoryLoader::load(repo.as_ref(), &records).await.unwrap();

    let items = repo.list_inventory().await.unwrap();
    let black = items.iter().find(|i| i.sku == "VNL-BLK").unwrap();

    assert_eq!(black.qty_on_hand, black.reorder_point);
    assert_eq!(black.status(), StockStatus::LowStock);
}

#[tokio::test]
async fn test_reorder_suggestions_from_loaded_inventory() {
    let (repo, _) = setup_test_db().await;
    let records = InventoryLoader::parse(INVENTORY_CSV.as_bytes()).unwrap();
    InventoryLoader::load(repo.as_ref(), &records).await.unwrap();

    let suggestions = reorder_suggestions(&repo.list_inventory().await.unwrap());

    let lines: Vec<_> = suggestions
        .iter()
        .map(|s| (s.sku.as_str(), s.suggested_qty, s.estimated_cost))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("LAM-GLS", dec!(2), dec!(193.00)),
            ("VNL-BLK", dec!(4), dec!(568.00)),
        ]
    );
}

// =========================================================================
// Catalog
// =========================================================================

#[tokio::test]
async fn test_load_catalog_into_sqlite() {
    let (repo, _) = setup_test_db().await;

    load_catalog(&repo).await;

    let services = repo.list_services().await.unwrap();
    let slugs: Vec<_> = services.iter().map(|s| s.slug.as_str()).collect();
    assert_eq!(slugs, vec!["banners", "vehicle-wraps"]);

    let wraps = repo.get_service_by_slug("vehicle-wraps").await.unwrap();
    let tiers = repo.list_tiers(wraps.id).await.unwrap();
    assert_eq!(tiers.len(), 3);
    assert_eq!(tiers[0].price, Some(dec!(450.00)));
    assert_eq!(tiers[2].price, None);
}

// =========================================================================
// Wizard on the SQLite backend
// =========================================================================

#[tokio::test]
async fn test_full_wizard_run_against_sqlite() {
    let (repo, drafts) = setup_test_db().await;
    load_catalog(&repo).await;
    let wraps = repo.get_service_by_slug("vehicle-wraps").await.unwrap();
    let api: Arc<dyn QuoteApi> = repo.clone();

    let mut session =
        WizardSession::mount(api.clone(), drafts.clone(), PricingCalculator::default()).await;
    session.select_service(wraps.id).await.unwrap();
    session.next().await.unwrap();
    session.set_detail("vehicle_type", json!("large_van")).await;
    session.set_detail("coverage", json!("full")).await;
    session.next().await.unwrap();
    let report = session
        .upload_files(vec![PendingUpload {
            filename: "van-side.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0; 2048],
        }])
        .await;
    assert!(report.failed.is_empty());
    session.next().await.unwrap();
    let print_only = session.tiers()[0].id;
    session.select_tier(print_only).await.unwrap();
    assert_eq!(session.next().await.unwrap(), WizardStep::Review);

    // A fresh mount sees the same draft.
    let remounted = WizardSession::mount(api.clone(), drafts.clone(), PricingCalculator::default()).await;
    assert_eq!(remounted.wizard().draft(), session.wizard().draft());

    let pricing = session.pricing().expect("tier has a fixed price");
    assert_eq!(pricing.subtotal, dec!(1150.00));
    assert_eq!(pricing.tax_amount, dec!(264.50));
    assert_eq!(pricing.total, dec!(1414.50));
    assert_eq!(pricing.deposit, dec!(707.25));
    assert_eq!(pricing.balance, dec!(707.25));

    let created = session.submit().await.expect("submission accepted");

    assert!(created.reference.starts_with("Q-"));
    assert_eq!(drafts.get(quote_core::draft::DRAFT_STORAGE_KEY).await.unwrap(), None);
    assert_eq!(session.current_step(), WizardStep::Service);
}

#[tokio::test]
async fn test_custom_priced_tier_leaves_pricing_pending() {
    let (repo, drafts) = setup_test_db().await;
    load_catalog(&repo).await;
    let wraps = repo.get_service_by_slug("vehicle-wraps").await.unwrap();

    let mut session = WizardSession::mount(repo.clone(), drafts, PricingCalculator::default()).await;
    session.select_service(wraps.id).await.unwrap();
    let fleet = session.tiers()[2].id;
    session.select_tier(fleet).await.unwrap();

    assert_eq!(session.pricing(), None);
}
