use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::stock::classify_stock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::LowStock => "low_stock",
            Self::OutOfStock => "out_of_stock",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::InStock => "In stock",
            Self::LowStock => "Low stock",
            Self::OutOfStock => "Out of stock",
        }
    }

    /// Whether the item should be picked up by reordering.
    pub fn needs_reorder(&self) -> bool {
        !matches!(self, Self::InStock)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub sku: String,
    pub name: String,
    /// Unit of measure (sheets, metres, litres...).
    pub unit: String,
    pub qty_on_hand: Decimal,
    pub reorder_point: Decimal,
    pub reorder_qty: Decimal,
    pub cost_per_unit: Decimal,
    pub supplier: Option<String>,
}

impl InventoryItem {
    pub fn status(&self) -> StockStatus {
        classify_stock(self.qty_on_hand, self.reorder_point)
    }
}

/// For creating new inventory items (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub qty_on_hand: Decimal,
    pub reorder_point: Decimal,
    pub reorder_qty: Decimal,
    pub cost_per_unit: Decimal,
    pub supplier: Option<String>,
}
