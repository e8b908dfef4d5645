use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload sent to the backend when the customer submits the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSubmission {
    pub service_id: i64,
    pub tier_id: i64,
    pub project_details: BTreeMap<String, Value>,
    pub file_ids: Vec<i64>,
    pub notes: String,
}

/// Backend acknowledgement of a submitted quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedQuote {
    pub id: i64,
    /// Customer-facing reference used for post-submission navigation.
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl CreatedQuote {
    /// Builds the acknowledgement for a freshly stored quote.
    pub fn new(
        id: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            reference: format!("Q-{}-{:05}", created_at.format("%Y"), id),
            created_at,
        }
    }
}
