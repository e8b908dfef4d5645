use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// For creating new services (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewService {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionFieldType {
    #[default]
    Text,
    Textarea,
    Number,
    Select,
    Checkbox,
}

impl OptionFieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "textarea" => Some(Self::Textarea),
            "number" => Some(Self::Number),
            "select" => Some(Self::Select),
            "checkbox" => Some(Self::Checkbox),
            _ => None,
        }
    }
}

/// A question asked in the project details step for a given service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOption {
    pub id: i64,
    pub service_id: i64,
    /// Key under which the answer is stored in the draft's project details.
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub field_type: OptionFieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub choices: Vec<String>,
    /// Free-form map from answer value to price delta, as delivered by the
    /// backend. Read through [`crate::models::PricingRule::for_answer`].
    #[serde(default)]
    pub pricing_impact: Option<serde_json::Value>,
}

/// For creating new service options (no id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServiceOption {
    pub service_id: i64,
    pub key: String,
    pub label: String,
    pub field_type: OptionFieldType,
    pub required: bool,
    pub choices: Vec<String>,
    pub pricing_impact: Option<serde_json::Value>,
}

/// A named package level for a service (e.g. Basic, Premium).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: i64,
    pub service_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// `None` means the tier is priced by hand after review.
    pub price: Option<Decimal>,
    pub features: Vec<String>,
    pub sort_order: i32,
}

/// For creating new tiers (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTier {
    pub service_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub features: Vec<String>,
    pub sort_order: i32,
}
