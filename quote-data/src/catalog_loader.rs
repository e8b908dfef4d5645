//! TOML loader for the service catalog.
//!
//! A catalog file lists services, each with the questions asked in the
//! project details step and the tiers it is sold in:
//!
//! ```toml
//! [[services]]
//! slug = "vehicle-wraps"
//! name = "Vehicle wraps"
//!
//! [[services.options]]
//! key = "coverage"
//! label = "Coverage"
//! field_type = "select"
//! required = true
//! choices = ["partial", "full"]
//! pricing_impact = { full = "300.00" }
//!
//! [[services.tiers]]
//! name = "Standard"
//! price = "450.00"
//! features = ["Design proof"]
//! ```
//!
//! A tier without `price` is priced by hand after review.
use std::sync::LazyLock;

use quote_core::{
    ApiError, NewService, NewServiceOption, NewTier, OptionFieldType, QuoteApi,
};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is valid")
});

static OPTION_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("option key pattern is valid"));

/// Errors that can occur when loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogLoaderError {
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid service slug '{0}' (use lowercase letters, digits and dashes)")]
    InvalidSlug(String),

    #[error("invalid option key '{key}' in service '{service}'")]
    InvalidOptionKey { service: String, key: String },

    #[error("duplicate option key '{key}' in service '{service}'")]
    DuplicateOptionKey { service: String, key: String },

    #[error("select option '{key}' in service '{service}' has no choices")]
    MissingChoices { service: String, key: String },

    #[error("tier '{tier}' in service '{service}' has a negative price")]
    NegativePrice { service: String, tier: String },

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CatalogFile {
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceEntry {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionEntry>,
    #[serde(default)]
    pub tiers: Vec<TierEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OptionEntry {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub field_type: OptionFieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub choices: Vec<String>,
    pub pricing_impact: Option<toml::Value>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TierEntry {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Counts of what a load created or skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub services: usize,
    pub options: usize,
    pub tiers: usize,
    pub skipped_services: usize,
}

pub struct CatalogLoader;

impl CatalogLoader {
    /// Parse and validate a catalog from TOML text.
    pub fn parse(text: &str) -> Result<CatalogFile, CatalogLoaderError> {
        let catalog: CatalogFile = toml::from_str(text)?;
        for service in &catalog.services {
            Self::validate(service)?;
        }
        Ok(catalog)
    }

    fn validate(service: &ServiceEntry) -> Result<(), CatalogLoaderError> {
        if !SLUG_RE.is_match(&service.slug) {
            return Err(CatalogLoaderError::InvalidSlug(service.slug.clone()));
        }

        let mut seen = std::collections::HashSet::new();
        for option in &service.options {
            if !OPTION_KEY_RE.is_match(&option.key) {
                return Err(CatalogLoaderError::InvalidOptionKey {
                    service: service.slug.clone(),
                    key: option.key.clone(),
                });
            }
            if !seen.insert(option.key.as_str()) {
                return Err(CatalogLoaderError::DuplicateOptionKey {
                    service: service.slug.clone(),
                    key: option.key.clone(),
                });
            }
            if option.field_type == OptionFieldType::Select && option.choices.is_empty() {
                return Err(CatalogLoaderError::MissingChoices {
                    service: service.slug.clone(),
                    key: option.key.clone(),
                });
            }
        }

        for tier in &service.tiers {
            if tier.price.is_some_and(|p| p.is_sign_negative() && !p.is_zero()) {
                return Err(CatalogLoaderError::NegativePrice {
                    service: service.slug.clone(),
                    tier: tier.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Create every service that does not exist yet, along with its options
    /// and tiers. Services whose slug is already present are left untouched,
    /// so the same catalog can be loaded repeatedly.
    pub async fn load<A: QuoteApi + ?Sized>(
        api: &A,
        catalog: &CatalogFile,
    ) -> Result<CatalogSummary, CatalogLoaderError> {
        let mut summary = CatalogSummary::default();

        for entry in &catalog.services {
            match api.get_service_by_slug(&entry.slug).await {
                Ok(_) => {
                    debug!(slug = %entry.slug, "service exists, skipping");
                    summary.skipped_services += 1;
                    continue;
                }
                Err(ApiError::NotFound) => {}
                Err(other) => return Err(other.into()),
            }

            let service = api
                .create_service(NewService {
                    slug: entry.slug.clone(),
                    name: entry.name.clone(),
                    description: entry.description.clone(),
                })
                .await?;
            summary.services += 1;

            for option in &entry.options {
                let pricing_impact = option.pricing_impact.as_ref().map(toml_to_json);
                api.create_service_option(NewServiceOption {
                    service_id: service.id,
                    key: option.key.clone(),
                    label: option.label.clone(),
                    field_type: option.field_type,
                    required: option.required,
                    choices: option.choices.clone(),
                    pricing_impact,
                })
                .await?;
                summary.options += 1;
            }

            for (index, tier) in entry.tiers.iter().enumerate() {
                api.create_tier(NewTier {
                    service_id: service.id,
                    name: tier.name.clone(),
                    description: tier.description.clone(),
                    price: tier.price,
                    features: tier.features.clone(),
                    sort_order: index as i32,
                })
                .await?;
                summary.tiers += 1;
            }

            info!(slug = %service.slug, "service loaded");
        }

        Ok(summary)
    }
}

/// Convert a TOML value to JSON. Datetimes become their string form.
fn toml_to_json(value: &toml::Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        toml::Value::String(s) => Json::String(s.clone()),
        toml::Value::Integer(i) => Json::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        toml::Value::Boolean(b) => Json::Bool(*b),
        toml::Value::Datetime(dt) => Json::String(dt.to_string()),
        toml::Value::Array(items) => Json::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Json::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}
