//! Derived values computed on the client side: quote pricing and inventory
//! stock status.
//!
//! Everything here is pure and cheap enough to rerun on every input change.

pub mod common;
pub mod pricing;
pub mod stock;

pub use pricing::{
    DEFAULT_TAX_RATE, DEPOSIT_SHARE, PricingBreakdown, PricingCalculator, compute_pricing,
    estimate_subtotal,
};
pub use stock::{ReorderSuggestion, StockSummary, classify_stock, reorder_suggestions, summarize_stock};
