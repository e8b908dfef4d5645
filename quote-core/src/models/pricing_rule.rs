use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Price effect of one answer to a service option.
///
/// Backends deliver `pricing_impact` as a free-form JSON object mapping an
/// answer value to a price delta, e.g. `{"large": 25, "xl": "40.50"}`. Any
/// shape that cannot be read as such a delta is treated as [`PricingRule::NoImpact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingRule {
    FixedDelta(Decimal),
    NoImpact,
}

impl PricingRule {
    /// Looks up the rule that applies to `answer` in an option's `pricing_impact`.
    ///
    /// Never fails: unknown answers, non-object impact maps and unreadable
    /// deltas all resolve to [`PricingRule::NoImpact`].
    pub fn for_answer(
        impact: Option<&Value>,
        answer: &Value,
    ) -> Self {
        let Some(impact) = impact else {
            return Self::NoImpact;
        };
        let Some(map) = impact.as_object() else {
            warn!(%impact, "ignoring pricing impact that is not an object");
            return Self::NoImpact;
        };
        let Some(answer_key) = answer_key(answer) else {
            return Self::NoImpact;
        };
        match map.get(&answer_key) {
            Some(delta) => match parse_delta(delta) {
                Some(value) => Self::FixedDelta(value),
                None => {
                    warn!(answer = %answer_key, %delta, "ignoring malformed pricing delta");
                    Self::NoImpact
                }
            },
            None => Self::NoImpact,
        }
    }

    pub fn delta(&self) -> Decimal {
        match self {
            Self::FixedDelta(value) => *value,
            Self::NoImpact => Decimal::ZERO,
        }
    }
}

fn answer_key(answer: &Value) -> Option<String> {
    match answer {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_delta(delta: &Value) -> Option<Decimal> {
    let text = match delta {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    text.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tracing_subscriber::fmt::format::FmtSpan;

    use super::*;

    /// Routes the skip warnings to the test output.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_span_events(FmtSpan::NONE)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    #[test]
    fn numeric_delta_is_fixed() {
        let impact = json!({"large": 25, "small": 0});

        let rule = PricingRule::for_answer(Some(&impact), &json!("large"));

        assert_eq!(rule, PricingRule::FixedDelta(dec!(25)));
    }

    #[test]
    fn string_delta_is_parsed() {
        let impact = json!({"xl": "40.50"});

        let rule = PricingRule::for_answer(Some(&impact), &json!("xl"));

        assert_eq!(rule, PricingRule::FixedDelta(dec!(40.50)));
    }

    #[test]
    fn negative_delta_is_kept() {
        let impact = json!({"reuse_artwork": -15.5});

        let rule = PricingRule::for_answer(Some(&impact), &json!("reuse_artwork"));

        assert_eq!(rule.delta(), dec!(-15.5));
    }

    #[test]
    fn boolean_answer_matches_string_key() {
        let impact = json!({"true": 12});

        let rule = PricingRule::for_answer(Some(&impact), &json!(true));

        assert_eq!(rule, PricingRule::FixedDelta(dec!(12)));
    }

    #[test]
    fn numeric_answer_matches_string_key() {
        let impact = json!({"3": 30});

        let rule = PricingRule::for_answer(Some(&impact), &json!(3));

        assert_eq!(rule, PricingRule::FixedDelta(dec!(30)));
    }

    #[test]
    fn unknown_answer_has_no_impact() {
        let impact = json!({"large": 25});

        let rule = PricingRule::for_answer(Some(&impact), &json!("medium"));

        assert_eq!(rule, PricingRule::NoImpact);
    }

    #[test]
    fn non_object_impact_is_skipped() {
        let _guard = init_test_tracing();
        let impact = json!([1, 2, 3]);

        let rule = PricingRule::for_answer(Some(&impact), &json!("1"));

        assert_eq!(rule, PricingRule::NoImpact);
    }

    #[test]
    fn malformed_delta_is_skipped() {
        let _guard = init_test_tracing();
        let impact = json!({"large": "a lot", "xl": {"nested": 1}});

        assert_eq!(
            PricingRule::for_answer(Some(&impact), &json!("large")),
            PricingRule::NoImpact
        );
        assert_eq!(
            PricingRule::for_answer(Some(&impact), &json!("xl")),
            PricingRule::NoImpact
        );
    }

    #[test]
    fn missing_impact_has_no_delta() {
        let rule = PricingRule::for_answer(None, &json!("anything"));

        assert_eq!(rule.delta(), Decimal::ZERO);
    }
}
