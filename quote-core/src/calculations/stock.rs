//! Stock status classification for inventory items.
//!
//! An item is out of stock at or below zero, low on stock up to and including
//! its reorder point, and in stock above it. The reorder point itself counts as
//! low: reorder automation keys off that boundary.
//!
//! Money and quantity arithmetic here saturates at the [`Decimal`] limits
//! instead of overflowing, so absurd inventory rows still produce a report.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{non_negative, round_half_up};
use crate::models::{InventoryItem, StockStatus};

/// Classifies a quantity on hand against its reorder point.
///
/// ```
/// use rust_decimal_macros::dec;
/// use quote_core::StockStatus;
/// use quote_core::calculations::classify_stock;
///
/// assert_eq!(classify_stock(dec!(0), dec!(5)), StockStatus::OutOfStock);
/// assert_eq!(classify_stock(dec!(5), dec!(5)), StockStatus::LowStock);
/// assert_eq!(classify_stock(dec!(6), dec!(5)), StockStatus::InStock);
/// ```
pub fn classify_stock(
    qty_on_hand: Decimal,
    reorder_point: Decimal,
) -> StockStatus {
    if qty_on_hand <= Decimal::ZERO {
        StockStatus::OutOfStock
    } else if qty_on_hand <= reorder_point {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

/// Counts per status over an item collection, plus the value of stock held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub total: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    /// Sum of `qty_on_hand × cost_per_unit` over items with positive stock.
    pub stock_value: Decimal,
}

impl StockSummary {
    pub fn count(
        &self,
        status: StockStatus,
    ) -> usize {
        match status {
            StockStatus::InStock => self.in_stock,
            StockStatus::LowStock => self.low_stock,
            StockStatus::OutOfStock => self.out_of_stock,
        }
    }

    /// Items that need reordering (low or out of stock).
    pub fn needing_reorder(&self) -> usize {
        self.low_stock + self.out_of_stock
    }
}

/// Tallies the collection with the same classifier used for per-item badges.
pub fn summarize_stock(items: &[InventoryItem]) -> StockSummary {
    let mut summary = items
        .iter()
        .fold(StockSummary::default(), |mut summary, item| {
            summary.total += 1;
            match item.status() {
                StockStatus::InStock => summary.in_stock += 1,
                StockStatus::LowStock => summary.low_stock += 1,
                StockStatus::OutOfStock => summary.out_of_stock += 1,
            }
            let held = non_negative(item.qty_on_hand).saturating_mul(item.cost_per_unit);
            summary.stock_value = summary.stock_value.saturating_add(held);
            summary
        });
    summary.stock_value = round_half_up(summary.stock_value);
    summary
}

/// An item that has reached its reorder point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub item_id: i64,
    pub sku: String,
    pub name: String,
    pub status: StockStatus,
    pub qty_on_hand: Decimal,
    pub suggested_qty: Decimal,
    pub estimated_cost: Decimal,
    pub supplier: Option<String>,
}

/// Lists every low or out-of-stock item, out-of-stock first, then by SKU.
///
/// The suggested quantity is the item's `reorder_qty`. Items without one get
/// the shortfall needed to climb back above the reorder point.
pub fn reorder_suggestions(items: &[InventoryItem]) -> Vec<ReorderSuggestion> {
    let mut suggestions: Vec<_> = items
        .iter()
        .filter_map(|item| {
            let status = item.status();
            if !status.needs_reorder() {
                return None;
            }
            let suggested_qty = if item.reorder_qty > Decimal::ZERO {
                item.reorder_qty
            } else {
                item.reorder_point
                    .saturating_sub(non_negative(item.qty_on_hand))
                    .saturating_add(Decimal::ONE)
            };
            Some(ReorderSuggestion {
                item_id: item.id,
                sku: item.sku.clone(),
                name: item.name.clone(),
                status,
                qty_on_hand: item.qty_on_hand,
                suggested_qty,
                estimated_cost: round_half_up(suggested_qty.saturating_mul(item.cost_per_unit)),
                supplier: item.supplier.clone(),
            })
        })
        .collect();

    suggestions.sort_by(|a, b| {
        let rank = |s: StockStatus| if s == StockStatus::OutOfStock { 0 } else { 1 };
        rank(a.status)
            .cmp(&rank(b.status))
            .then_with(|| a.sku.cmp(&b.sku))
    });
    suggestions
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn item(
        id: i64,
        sku: &str,
        qty_on_hand: Decimal,
        reorder_point: Decimal,
        reorder_qty: Decimal,
    ) -> InventoryItem {
        InventoryItem {
            id,
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            unit: "sheet".to_string(),
            qty_on_hand,
            reorder_point,
            reorder_qty,
            cost_per_unit: dec!(2.50),
            supplier: Some("Acme Media".to_string()),
        }
    }

    // =========================================================================
    // classify_stock tests
    // =========================================================================

    #[test]
    fn classify_boundary_is_low_stock() {
        let result = classify_stock(dec!(5), dec!(5));

        assert_eq!(result, StockStatus::LowStock);
    }

    #[test]
    fn classify_zero_is_out_of_stock() {
        assert_eq!(classify_stock(dec!(0), dec!(5)), StockStatus::OutOfStock);
    }

    #[test]
    fn classify_negative_is_out_of_stock() {
        assert_eq!(classify_stock(dec!(-3), dec!(5)), StockStatus::OutOfStock);
    }

    #[test]
    fn classify_just_above_zero_is_low() {
        assert_eq!(classify_stock(dec!(0.5), dec!(5)), StockStatus::LowStock);
    }

    #[test]
    fn classify_above_reorder_point_is_in_stock() {
        assert_eq!(classify_stock(dec!(5.01), dec!(5)), StockStatus::InStock);
    }

    #[test]
    fn classify_zero_reorder_point_skips_low_band() {
        assert_eq!(classify_stock(dec!(1), dec!(0)), StockStatus::InStock);
        assert_eq!(classify_stock(dec!(0), dec!(0)), StockStatus::OutOfStock);
    }

    #[test]
    fn classify_sweep_matches_definition() {
        let reorder_point = dec!(10);
        for qty in -5..25 {
            let qty = Decimal::from(qty);
            let expected = if qty <= Decimal::ZERO {
                StockStatus::OutOfStock
            } else if qty <= reorder_point {
                StockStatus::LowStock
            } else {
                StockStatus::InStock
            };

            assert_eq!(classify_stock(qty, reorder_point), expected, "qty {qty}");
        }
    }

    // =========================================================================
    // summarize_stock tests
    // =========================================================================

    #[test]
    fn summary_counts_agree_with_item_badges() {
        let items = vec![
            item(1, "VIN-001", dec!(40), dec!(10), dec!(20)),
            item(2, "VIN-002", dec!(10), dec!(10), dec!(20)),
            item(3, "INK-001", dec!(0), dec!(2), dec!(5)),
            item(4, "INK-002", dec!(1), dec!(2), dec!(5)),
        ];

        let summary = summarize_stock(&items);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.in_stock, 1);
        assert_eq!(summary.low_stock, 2);
        assert_eq!(summary.out_of_stock, 1);
        assert_eq!(summary.needing_reorder(), 3);
        for status in [StockStatus::InStock, StockStatus::LowStock, StockStatus::OutOfStock] {
            let badges = items.iter().filter(|i| i.status() == status).count();
            assert_eq!(summary.count(status), badges);
        }
    }

    #[test]
    fn summary_values_positive_stock_only() {
        let items = vec![
            item(1, "VIN-001", dec!(40), dec!(10), dec!(20)),
            item(2, "VIN-002", dec!(-4), dec!(10), dec!(20)),
        ];

        let summary = summarize_stock(&items);

        assert_eq!(summary.stock_value, dec!(100.00));
    }

    #[test]
    fn summary_of_empty_collection_is_zero() {
        assert_eq!(summarize_stock(&[]), StockSummary::default());
    }

    #[test]
    fn summary_value_saturates_on_huge_stock() {
        let mut huge = item(1, "VIN-001", Decimal::MAX, dec!(10), dec!(20));
        huge.cost_per_unit = Decimal::MAX;
        let items = vec![huge, item(2, "VIN-002", Decimal::MAX, dec!(10), dec!(20))];

        let summary = summarize_stock(&items);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.in_stock, 2);
        assert_eq!(summary.stock_value, Decimal::MAX);
    }

    #[test]
    fn classify_extreme_quantities() {
        assert_eq!(classify_stock(Decimal::MIN, Decimal::MAX), StockStatus::OutOfStock);
        assert_eq!(classify_stock(Decimal::MAX, Decimal::MAX), StockStatus::LowStock);
        assert_eq!(classify_stock(Decimal::MAX, Decimal::MIN), StockStatus::InStock);
    }

    // =========================================================================
    // reorder_suggestions tests
    // =========================================================================

    #[test]
    fn suggestions_list_out_of_stock_first() {
        let items = vec![
            item(1, "B-LOW", dec!(3), dec!(5), dec!(10)),
            item(2, "A-OK", dec!(30), dec!(5), dec!(10)),
            item(3, "C-OUT", dec!(0), dec!(5), dec!(10)),
            item(4, "A-LOW", dec!(5), dec!(5), dec!(10)),
        ];

        let skus: Vec<_> = reorder_suggestions(&items)
            .into_iter()
            .map(|s| s.sku)
            .collect();

        assert_eq!(skus, vec!["C-OUT", "A-LOW", "B-LOW"]);
    }

    #[test]
    fn suggestion_uses_reorder_qty() {
        let items = vec![item(1, "VIN-001", dec!(2), dec!(5), dec!(25))];

        let suggestion = &reorder_suggestions(&items)[0];

        assert_eq!(suggestion.suggested_qty, dec!(25));
        assert_eq!(suggestion.estimated_cost, dec!(62.50));
    }

    #[test]
    fn suggestion_without_reorder_qty_covers_shortfall() {
        let items = vec![item(1, "VIN-001", dec!(2), dec!(5), dec!(0))];

        let suggestion = &reorder_suggestions(&items)[0];

        // Back to one above the reorder point: 5 - 2 + 1
        assert_eq!(suggestion.suggested_qty, dec!(4));
    }

    #[test]
    fn suggestion_at_numeric_limits_saturates() {
        let mut extreme = item(1, "VIN-001", Decimal::MIN, Decimal::MAX, dec!(0));
        extreme.cost_per_unit = Decimal::MAX;

        let suggestion = &reorder_suggestions(&[extreme])[0];

        assert_eq!(suggestion.status, StockStatus::OutOfStock);
        assert_eq!(suggestion.suggested_qty, Decimal::MAX);
        assert_eq!(suggestion.estimated_cost, Decimal::MAX);
    }
}
