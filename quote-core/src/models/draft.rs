use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ServiceOption;
use crate::wizard::WizardStep;

/// Metadata for a file attached to a quote. File bytes are never kept here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Identifier assigned by the backend once the upload completed.
    pub id: i64,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Cached validity of the gated wizard steps. Step 5 (review) has no predicate
/// of its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepValidation {
    pub step1: bool,
    pub step2: bool,
    pub step3: bool,
    pub step4: bool,
}

impl StepValidation {
    pub fn is_valid(
        &self,
        step: WizardStep,
    ) -> bool {
        match step {
            WizardStep::Service => self.step1,
            WizardStep::Details => self.step2,
            WizardStep::Files => self.step3,
            WizardStep::Tier => self.step4,
            WizardStep::Review => self.step1 && self.step2 && self.step3 && self.step4,
        }
    }
}

/// The in-progress, not-yet-submitted state of the quote wizard.
///
/// This is the exact value mirrored to draft storage, so every field that
/// must survive a reload lives here. `project_details` is ordered to keep the
/// serialized form stable across save/load cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub selected_service: Option<i64>,
    #[serde(default)]
    pub service_options: Vec<ServiceOption>,
    #[serde(default)]
    pub project_details: BTreeMap<String, Value>,
    #[serde(default)]
    pub uploaded_files: Vec<UploadedFile>,
    pub selected_tier: Option<i64>,
    #[serde(default)]
    pub step_validation: StepValidation,
    #[serde(default)]
    pub current_step: WizardStep,
    #[serde(default)]
    pub notes: String,
}

impl QuoteDraft {
    /// True when nothing has been entered yet.
    pub fn is_blank(&self) -> bool {
        self.selected_service.is_none()
            && self.project_details.is_empty()
            && self.uploaded_files.is_empty()
            && self.selected_tier.is_none()
            && self.notes.is_empty()
    }

    pub fn file_ids(&self) -> Vec<i64> {
        self.uploaded_files.iter().map(|f| f.id).collect()
    }
}

/// Whether a project detail value counts as answered.
///
/// `null`, blank strings, and empty lists or objects are unanswered. Numbers
/// and booleans (including `false`) are explicit answers.
pub fn is_answered(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Number(_)) | Some(Value::Bool(_)) => true,
    }
}
