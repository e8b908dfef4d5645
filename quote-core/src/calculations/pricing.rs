//! Quote pricing derived from a subtotal.
//!
//! | Field        | Rule |
//! |--------------|------|
//! | `subtotal`   | Input, clamped to zero, rounded to cents |
//! | `tax_amount` | `round(subtotal × tax_rate)` |
//! | `total`      | `subtotal + tax_amount` |
//! | `deposit`    | `round(total × 50%)` |
//! | `balance`    | `total - deposit` |
//!
//! The balance is derived by subtraction rather than rounded on its own, so
//! `deposit + balance == total` holds exactly for every input.
//!
//! All arithmetic is checked. A subtotal whose tax or total would not fit in a
//! [`Decimal`] yields no breakdown, which is shown as pending pricing.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use quote_core::calculations::{PricingCalculator, DEFAULT_TAX_RATE};
//!
//! let calculator = PricingCalculator::new(DEFAULT_TAX_RATE);
//! let pricing = calculator.compute(Some(dec!(100.00))).unwrap();
//!
//! assert_eq!(pricing.tax_amount, dec!(23.00));
//! assert_eq!(pricing.total, dec!(123.00));
//! assert_eq!(pricing.deposit, dec!(61.50));
//! assert_eq!(pricing.balance, dec!(61.50));
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::calculations::common::{non_negative, round_half_up};
use crate::models::{PricingRule, ServiceOption, Tier, is_answered};

/// VAT applied to quotes unless configured otherwise (23%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(23, 0, 0, false, 2);

/// Share of the total payable upfront (50%).
pub const DEPOSIT_SHARE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Derived pricing for a quote. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    /// Upfront-payable half of the total.
    pub deposit: Decimal,
    /// Remainder due on completion.
    pub balance: Decimal,
}

/// Calculator for quote pricing at a fixed tax rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingCalculator {
    tax_rate: Decimal,
}

impl PricingCalculator {
    /// Creates a calculator for `tax_rate` (e.g. `0.23`). A negative rate is
    /// treated as zero.
    pub fn new(tax_rate: Decimal) -> Self {
        if tax_rate.is_sign_negative() && !tax_rate.is_zero() {
            warn!(%tax_rate, "negative tax rate clamped to zero");
        }
        Self {
            tax_rate: non_negative(tax_rate),
        }
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Computes the full breakdown for `subtotal`.
    ///
    /// Returns `None` when no subtotal is known yet, which callers display as
    /// pending custom pricing rather than as a zero amount. Negative subtotals
    /// are clamped to zero. Subtotals too large to price also return `None`.
    pub fn compute(
        &self,
        subtotal: Option<Decimal>,
    ) -> Option<PricingBreakdown> {
        let subtotal = subtotal?;
        if subtotal.is_sign_negative() && !subtotal.is_zero() {
            warn!(%subtotal, "negative subtotal clamped to zero");
        }
        let subtotal = round_half_up(non_negative(subtotal));

        let breakdown = self.breakdown(subtotal);
        if breakdown.is_none() {
            warn!(%subtotal, "subtotal out of range, pricing left pending");
        }
        breakdown
    }

    fn breakdown(
        &self,
        subtotal: Decimal,
    ) -> Option<PricingBreakdown> {
        let tax_amount = self.tax_amount(subtotal)?;
        let total = self.total(subtotal, tax_amount)?;
        let deposit = self.deposit(total)?;
        let balance = self.balance(total, deposit);

        Some(PricingBreakdown {
            subtotal,
            tax_rate: self.tax_rate,
            tax_amount,
            total,
            deposit,
            balance,
        })
    }

    fn tax_amount(
        &self,
        subtotal: Decimal,
    ) -> Option<Decimal> {
        subtotal.checked_mul(self.tax_rate).map(round_half_up)
    }

    fn total(
        &self,
        subtotal: Decimal,
        tax_amount: Decimal,
    ) -> Option<Decimal> {
        subtotal.checked_add(tax_amount)
    }

    fn deposit(
        &self,
        total: Decimal,
    ) -> Option<Decimal> {
        total.checked_mul(DEPOSIT_SHARE).map(round_half_up)
    }

    fn balance(
        &self,
        total: Decimal,
        deposit: Decimal,
    ) -> Decimal {
        total - deposit
    }
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_TAX_RATE)
    }
}

/// Computes pricing for `subtotal` at `tax_rate`.
///
/// Shorthand for [`PricingCalculator::compute`].
pub fn compute_pricing(
    subtotal: Option<Decimal>,
    tax_rate: Decimal,
) -> Option<PricingBreakdown> {
    PricingCalculator::new(tax_rate).compute(subtotal)
}

/// Estimates a quote subtotal from the selected tier and the answers given.
///
/// The tier price is the base; every answered option adds the delta its
/// `pricing_impact` assigns to the answer. Returns `None` when no tier is
/// chosen or the tier is custom-priced.
///
/// A delta that would overflow the running subtotal is skipped like any other
/// unreadable rule.
pub fn estimate_subtotal(
    tier: Option<&Tier>,
    options: &[ServiceOption],
    details: &BTreeMap<String, Value>,
) -> Option<Decimal> {
    let base = tier?.price?;

    let subtotal = options
        .iter()
        .filter_map(|option| {
            let answer = details.get(&option.key);
            if !is_answered(answer) {
                return None;
            }
            let rule = PricingRule::for_answer(option.pricing_impact.as_ref(), answer?);
            Some((option.key.as_str(), rule.delta()))
        })
        .fold(base, |running, (key, delta)| {
            running.checked_add(delta).unwrap_or_else(|| {
                warn!(option = key, %delta, "ignoring pricing delta out of range");
                running
            })
        });

    Some(non_negative(subtotal))
}
