use std::io::Read;

use quote_core::{ApiError, NewInventoryItem, QuoteApi};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when loading inventory data.
#[derive(Debug, Error)]
pub enum InventoryLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),
}

impl From<csv::Error> for InventoryLoaderError {
    fn from(err: csv::Error) -> Self {
        InventoryLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the inventory CSV file.
///
/// - `sku`: unique stock keeping unit, used as the upsert key
/// - `name`, `unit`: display name and unit of measure (e.g. `sheet`, `litre`)
/// - `qty_on_hand`: current stock; zero or below means out of stock
/// - `reorder_point`: stock at or below this level is low stock
/// - `reorder_qty`: quantity to order when restocking (may be 0)
/// - `cost_per_unit`: purchase cost
/// - `supplier`: optional, leave empty for none
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InventoryRecord {
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub qty_on_hand: Decimal,
    pub reorder_point: Decimal,
    pub reorder_qty: Decimal,
    pub cost_per_unit: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub supplier: Option<String>,
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

impl InventoryRecord {
    fn validate(
        &self,
        row: usize,
    ) -> Result<(), InventoryLoaderError> {
        let invalid = |reason: String| InventoryLoaderError::InvalidRecord { row, reason };

        if self.sku.trim().is_empty() {
            return Err(invalid("sku is empty".to_string()));
        }
        for (field, value) in [
            ("reorder_point", self.reorder_point),
            ("reorder_qty", self.reorder_qty),
            ("cost_per_unit", self.cost_per_unit),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(invalid(format!("{} must not be negative ({})", field, value)));
            }
        }
        Ok(())
    }

    fn into_new_item(self) -> NewInventoryItem {
        NewInventoryItem {
            sku: self.sku.trim().to_string(),
            name: self.name,
            unit: self.unit,
            qty_on_hand: self.qty_on_hand,
            reorder_point: self.reorder_point,
            reorder_qty: self.reorder_qty,
            cost_per_unit: self.cost_per_unit,
            supplier: self.supplier,
        }
    }
}

/// Loader for inventory data from CSV files.
///
/// Records are written through the [`QuoteApi`] trait, so any backend works.
/// Loading is an upsert keyed by SKU: running the same file twice leaves the
/// inventory unchanged.
pub struct InventoryLoader;

impl InventoryLoader {
    /// Parse and validate inventory records from a CSV reader.
    ///
    /// Row numbers in errors are 1-based and do not count the header.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<InventoryRecord>, InventoryLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for (index, result) in csv_reader.deserialize().enumerate() {
            let record: InventoryRecord = result?;
            record.validate(index + 1)?;
            records.push(record);
        }

        Ok(records)
    }

    /// Upsert every record. Returns the number of items written.
    pub async fn load<A: QuoteApi + ?Sized>(
        api: &A,
        records: &[InventoryRecord],
    ) -> Result<usize, InventoryLoaderError> {
        for record in records {
            let item = api.upsert_inventory_item(record.clone().into_new_item()).await?;
            debug!(sku = %item.sku, status = item.status().as_str(), "inventory item loaded");
        }
        Ok(records.len())
    }
}
