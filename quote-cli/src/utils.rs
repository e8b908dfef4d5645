use std::path::Path;

use rust_decimal::Decimal;
use thiserror::Error;

/// Shown instead of an amount while a quote has no fixed price.
pub const PENDING_PRICING: &str = "Custom pricing — pending";

/// Error returned when a string cannot be parsed as a [`Decimal`].
#[derive(Debug, Error)]
#[error("invalid decimal '{input}': {source}")]
pub struct ParseDecimalError {
    input: String,
    #[source]
    source: rust_decimal::Error,
}

/// Trims whitespace and drops a leading euro sign and comma thousands separators.
fn normalize_decimal_input(s: &str) -> String {
    s.trim().trim_start_matches('€').trim().replace(',', "")
}

/// Parses a string into a [`Decimal`].
///
/// Handles comma as thousands separator (e.g. `"1,234.56"`) and a leading
/// `€`. Empty or whitespace-only input is treated as 0.
pub fn parse_decimal(s: &str) -> Result<Decimal, ParseDecimalError> {
    let normalized = normalize_decimal_input(s);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    normalized.parse().map_err(|e| {
        tracing::debug!(input = %s, "invalid decimal: {}", e);
        ParseDecimalError {
            input: s.to_string(),
            source: e,
        }
    })
}

/// Parses an amount that may be absent.
///
/// Empty input, `none` and `custom` mean "no price yet" and yield `None`.
pub fn parse_optional_decimal(s: &str) -> Result<Option<Decimal>, ParseDecimalError> {
    let normalized = normalize_decimal_input(s);
    if normalized.is_empty()
        || normalized.eq_ignore_ascii_case("none")
        || normalized.eq_ignore_ascii_case("custom")
    {
        return Ok(None);
    }
    parse_decimal(&normalized).map(Some)
}

/// Formats an amount as euros with two decimals and comma grouping,
/// e.g. `€1,414.50`.
pub fn format_money(d: Decimal) -> String {
    let rounded = d.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}€{grouped}.{fraction}")
}

/// Formats an optional amount, using [`PENDING_PRICING`] when `None`.
pub fn format_optional_money(d: Option<Decimal>) -> String {
    d.map(format_money)
        .unwrap_or_else(|| PENDING_PRICING.to_string())
}

/// Formats a rate such as `0.23` as `23%`.
pub fn format_percent(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

/// Guesses a MIME type from the file extension. Artwork formats common in
/// print shops are listed explicitly.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("tif" | "tiff") => "image/tiff",
        Some("svg") => "image/svg+xml",
        Some("ai") => "application/postscript",
        Some("eps") => "application/postscript",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Human-readable file size, e.g. `2.0 KB`.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
