use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{QuoteDraft, ServiceOption, StepValidation, UploadedFile, is_answered};
use crate::wizard::WizardStep;

/// Why the wizard refused to move forward.
///
/// The messages are shown to the customer as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepBlocked {
    #[error("select a service first")]
    ServiceNotSelected,

    #[error("complete all required fields ({})", .missing.join(", "))]
    RequiredFieldsIncomplete { missing: Vec<String> },

    #[error("select a tier")]
    TierNotSelected,

    #[error("unknown wizard step {0}")]
    UnknownStep(u8),
}

/// Step-gated state of the quote wizard.
///
/// Owns the [`QuoteDraft`] and keeps its `step_validation` in sync after every
/// mutation. Moving backward is always allowed; moving forward requires every
/// earlier step to be valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteWizard {
    draft: QuoteDraft,
}

impl QuoteWizard {
    pub fn new() -> Self {
        Self::from_draft(QuoteDraft::default())
    }

    /// Resumes a wizard from a restored draft. Cached validity is recomputed
    /// rather than trusted.
    pub fn from_draft(draft: QuoteDraft) -> Self {
        let mut wizard = Self { draft };
        wizard.revalidate();
        wizard
    }

    pub fn draft(&self) -> &QuoteDraft {
        &self.draft
    }

    pub fn into_draft(self) -> QuoteDraft {
        self.draft
    }

    pub fn current_step(&self) -> WizardStep {
        self.draft.current_step
    }

    pub fn step_validation(&self) -> StepValidation {
        self.draft.step_validation
    }

    pub fn selected_service(&self) -> Option<i64> {
        self.draft.selected_service
    }

    pub fn selected_tier(&self) -> Option<i64> {
        self.draft.selected_tier
    }

    pub fn service_options(&self) -> &[ServiceOption] {
        &self.draft.service_options
    }

    pub fn project_details(&self) -> &BTreeMap<String, Value> {
        &self.draft.project_details
    }

    pub fn uploaded_files(&self) -> &[UploadedFile] {
        &self.draft.uploaded_files
    }

    pub fn notes(&self) -> &str {
        &self.draft.notes
    }

    // ── mutations ────────────────────────────────────────────────────────

    /// Selects a service along with its freshly fetched option list.
    ///
    /// Switching to a different service discards the answers and tier chosen
    /// for the previous one; reselecting the same service only refreshes the
    /// options.
    pub fn select_service(
        &mut self,
        service_id: i64,
        options: Vec<ServiceOption>,
    ) {
        if self.draft.selected_service != Some(service_id) {
            debug!(service_id, "service changed, resetting details and tier");
            self.draft.project_details.clear();
            self.draft.selected_tier = None;
        }
        self.draft.selected_service = Some(service_id);
        self.draft.service_options = options;
        self.revalidate();
    }

    /// Replaces the option list (e.g. after a re-fetch) and re-evaluates the
    /// required set.
    pub fn set_service_options(
        &mut self,
        options: Vec<ServiceOption>,
    ) {
        self.draft.service_options = options;
        self.revalidate();
    }

    pub fn set_detail(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) {
        self.draft.project_details.insert(key.into(), value);
        self.revalidate();
    }

    /// Removes an answer. Returns whether one was present.
    pub fn clear_detail(
        &mut self,
        key: &str,
    ) -> bool {
        let removed = self.draft.project_details.remove(key).is_some();
        self.revalidate();
        removed
    }

    /// Attaches uploaded file metadata, replacing any earlier file with the
    /// same name.
    pub fn add_file(
        &mut self,
        file: UploadedFile,
    ) {
        self.draft
            .uploaded_files
            .retain(|existing| existing.filename != file.filename);
        self.draft.uploaded_files.push(file);
        self.revalidate();
    }

    pub fn remove_file(
        &mut self,
        filename: &str,
    ) -> Option<UploadedFile> {
        let index = self
            .draft
            .uploaded_files
            .iter()
            .position(|f| f.filename == filename)?;
        let removed = self.draft.uploaded_files.remove(index);
        self.revalidate();
        Some(removed)
    }

    pub fn select_tier(
        &mut self,
        tier_id: Option<i64>,
    ) {
        self.draft.selected_tier = tier_id;
        self.revalidate();
    }

    pub fn set_notes(
        &mut self,
        notes: impl Into<String>,
    ) {
        self.draft.notes = notes.into();
        self.revalidate();
    }

    /// Clears everything and returns to the first step.
    pub fn reset(&mut self) {
        self.draft = QuoteDraft::default();
        self.revalidate();
    }

    // ── validation ───────────────────────────────────────────────────────

    /// Required options that have no usable answer yet.
    pub fn missing_required(&self) -> Vec<&ServiceOption> {
        self.draft
            .service_options
            .iter()
            .filter(|option| option.required)
            .filter(|option| !is_answered(self.draft.project_details.get(&option.key)))
            .collect()
    }

    /// Evaluates the validity predicate of one step.
    pub fn check_step(
        &self,
        step: WizardStep,
    ) -> Result<(), StepBlocked> {
        match step {
            WizardStep::Service => {
                if self.draft.selected_service.is_none() {
                    return Err(StepBlocked::ServiceNotSelected);
                }
            }
            WizardStep::Details => {
                let missing = self.missing_required();
                if !missing.is_empty() {
                    return Err(StepBlocked::RequiredFieldsIncomplete {
                        missing: missing.iter().map(|o| o.label.clone()).collect(),
                    });
                }
            }
            // File upload is optional.
            WizardStep::Files => {}
            WizardStep::Tier => {
                if self.draft.selected_tier.is_none() {
                    return Err(StepBlocked::TierNotSelected);
                }
            }
            WizardStep::Review => {
                for step in WizardStep::Review.prerequisites() {
                    self.check_step(step)?;
                }
            }
        }
        Ok(())
    }

    /// Checks that every step before review is satisfied.
    pub fn ready_to_submit(&self) -> Result<(), StepBlocked> {
        self.check_step(WizardStep::Review)
    }

    // ── navigation ───────────────────────────────────────────────────────

    /// Moves to `to`.
    ///
    /// Backward (or same-step) moves always succeed. Forward moves succeed
    /// only when every step before `to` is valid; otherwise the first unmet
    /// step is reported and the current step is left unchanged.
    pub fn advance(
        &mut self,
        to: WizardStep,
    ) -> Result<WizardStep, StepBlocked> {
        let from = self.draft.current_step;
        if to > from {
            for step in to.prerequisites() {
                if let Err(blocked) = self.check_step(step) {
                    warn!(%from, %to, %blocked, "wizard transition blocked");
                    return Err(blocked);
                }
            }
        }
        debug!(%from, %to, "wizard step changed");
        self.draft.current_step = to;
        Ok(to)
    }

    /// Moves to a step by its number (1–5).
    pub fn advance_to_number(
        &mut self,
        number: u8,
    ) -> Result<WizardStep, StepBlocked> {
        let to = WizardStep::try_from(number)?;
        self.advance(to)
    }

    /// Moves one step forward. Staying on review is a no-op.
    pub fn next(&mut self) -> Result<WizardStep, StepBlocked> {
        match self.draft.current_step.next() {
            Some(to) => self.advance(to),
            None => Ok(self.draft.current_step),
        }
    }

    /// Moves one step back. Staying on the first step is a no-op.
    pub fn back(&mut self) -> WizardStep {
        if let Some(to) = self.draft.current_step.prev() {
            self.draft.current_step = to;
        }
        self.draft.current_step
    }

    fn revalidate(&mut self) {
        self.draft.step_validation = StepValidation {
            step1: self.check_step(WizardStep::Service).is_ok(),
            step2: self.check_step(WizardStep::Details).is_ok(),
            step3: self.check_step(WizardStep::Files).is_ok(),
            step4: self.check_step(WizardStep::Tier).is_ok(),
        };
    }
}
