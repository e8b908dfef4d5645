use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::upload::{PendingUpload, UploadReport, UploadTracker, upload_all};
use super::{QuoteWizard, StepBlocked, WizardStep};
use crate::api::{ApiError, QuoteApi};
use crate::calculations::{PricingBreakdown, PricingCalculator, estimate_subtotal};
use crate::draft::{DraftError, DraftPersistence, DraftStore};
use crate::models::{CreatedQuote, QuoteSubmission, Tier, UploadedFile};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("quote is incomplete: {0}")]
    Incomplete(#[from] StepBlocked),

    #[error("submission failed: {0}")]
    Api(#[from] ApiError),
}

/// A mounted quote wizard wired to its collaborators.
///
/// Mounting restores the stored draft once. Every mutation afterwards is
/// written through to draft storage; a failed write is logged and does not
/// touch the in-memory state. The draft is removed from storage only after the
/// backend acknowledges a submission.
pub struct WizardSession {
    api: Arc<dyn QuoteApi>,
    persistence: DraftPersistence,
    calculator: PricingCalculator,
    wizard: QuoteWizard,
    tiers: Vec<Tier>,
    uploads: UploadTracker,
}

impl WizardSession {
    pub async fn mount(
        api: Arc<dyn QuoteApi>,
        drafts: Arc<dyn DraftStore>,
        calculator: PricingCalculator,
    ) -> Self {
        let persistence = DraftPersistence::new(drafts);
        let wizard = match persistence.load_draft().await {
            Some(draft) => QuoteWizard::from_draft(draft),
            None => QuoteWizard::new(),
        };

        let mut session = Self {
            api,
            persistence,
            calculator,
            wizard,
            tiers: Vec::new(),
            uploads: UploadTracker::new(),
        };
        if let Some(service_id) = session.wizard.selected_service() {
            match session.api.list_tiers(service_id).await {
                Ok(tiers) => session.tiers = tiers,
                Err(error) => warn!(service_id, %error, "could not load tiers for restored draft"),
            }
        }
        session
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn wizard(&self) -> &QuoteWizard {
        &self.wizard
    }

    pub fn current_step(&self) -> WizardStep {
        self.wizard.current_step()
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn selected_tier(&self) -> Option<&Tier> {
        let tier_id = self.wizard.selected_tier()?;
        self.tiers.iter().find(|t| t.id == tier_id)
    }

    pub fn upload_progress(
        &self,
        filename: &str,
    ) -> Option<u8> {
        self.uploads.progress(filename)
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    pub fn subtotal(&self) -> Option<Decimal> {
        estimate_subtotal(
            self.selected_tier(),
            self.wizard.service_options(),
            self.wizard.project_details(),
        )
    }

    /// Pricing for the current selections; `None` while pricing is pending.
    pub fn pricing(&self) -> Option<PricingBreakdown> {
        self.calculator.compute(self.subtotal())
    }

    // ── mutations ────────────────────────────────────────────────────────

    /// Selects a service, fetching its options and tiers first. If either
    /// fetch fails the wizard is left untouched.
    pub async fn select_service(
        &mut self,
        service_id: i64,
    ) -> Result<(), ApiError> {
        let options = self.api.list_service_options(service_id).await?;
        let tiers = self.api.list_tiers(service_id).await?;
        self.wizard.select_service(service_id, options);
        self.tiers = tiers;
        self.persist().await;
        Ok(())
    }

    /// Re-fetches the option list of the selected service.
    pub async fn refresh_options(&mut self) -> Result<(), ApiError> {
        let Some(service_id) = self.wizard.selected_service() else {
            return Ok(());
        };
        let options = self.api.list_service_options(service_id).await?;
        self.wizard.set_service_options(options);
        self.persist().await;
        Ok(())
    }

    pub async fn set_detail(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) {
        self.wizard.set_detail(key, value);
        self.persist().await;
    }

    pub async fn clear_detail(
        &mut self,
        key: &str,
    ) -> bool {
        let removed = self.wizard.clear_detail(key);
        self.persist().await;
        removed
    }

    /// Selects one of the tiers offered for the selected service.
    pub async fn select_tier(
        &mut self,
        tier_id: i64,
    ) -> Result<(), ApiError> {
        if !self.tiers.iter().any(|t| t.id == tier_id) {
            return Err(ApiError::NotFound);
        }
        self.wizard.select_tier(Some(tier_id));
        self.persist().await;
        Ok(())
    }

    pub async fn set_notes(
        &mut self,
        notes: impl Into<String>,
    ) {
        self.wizard.set_notes(notes);
        self.persist().await;
    }

    pub async fn remove_file(
        &mut self,
        filename: &str,
    ) -> Option<UploadedFile> {
        let removed = self.wizard.remove_file(filename);
        if removed.is_some() {
            self.persist().await;
        }
        removed
    }

    /// Uploads the files concurrently and attaches each one to the draft as
    /// soon as it completes.
    pub async fn upload_files(
        &mut self,
        files: Vec<PendingUpload>,
    ) -> UploadReport {
        let wizard = &mut self.wizard;
        let report = upload_all(Arc::clone(&self.api), &self.uploads, files, |file| {
            wizard.add_file(file.clone())
        })
        .await;
        if !report.uploaded.is_empty() {
            self.persist().await;
        }
        report
    }

    // ── navigation ───────────────────────────────────────────────────────

    pub async fn advance(
        &mut self,
        to: WizardStep,
    ) -> Result<WizardStep, StepBlocked> {
        let step = self.wizard.advance(to)?;
        self.persist().await;
        Ok(step)
    }

    pub async fn next(&mut self) -> Result<WizardStep, StepBlocked> {
        let step = self.wizard.next()?;
        self.persist().await;
        Ok(step)
    }

    pub async fn back(&mut self) -> WizardStep {
        let step = self.wizard.back();
        self.persist().await;
        step
    }

    // ── submission ───────────────────────────────────────────────────────

    /// Submits the quote.
    ///
    /// On success the stored draft is cleared and the wizard starts over. On
    /// any failure the draft stays exactly as it was so the customer can retry.
    pub async fn submit(&mut self) -> Result<CreatedQuote, SubmitError> {
        self.wizard.ready_to_submit()?;
        let draft = self.wizard.draft();
        let (Some(service_id), Some(tier_id)) = (draft.selected_service, draft.selected_tier)
        else {
            return Err(StepBlocked::ServiceNotSelected.into());
        };

        let submission = QuoteSubmission {
            service_id,
            tier_id,
            project_details: draft.project_details.clone(),
            file_ids: draft.file_ids(),
            notes: draft.notes.clone(),
        };

        let created = match self.api.submit_quote(submission).await {
            Ok(created) => created,
            Err(error) => {
                warn!(%error, "quote submission failed, draft kept");
                return Err(error.into());
            }
        };
        info!(reference = %created.reference, id = created.id, "quote submitted");

        if let Err(error) = self.persistence.clear_draft().await {
            warn!(%error, "quote submitted but the stored draft could not be cleared");
        }
        self.wizard.reset();
        self.tiers.clear();
        Ok(created)
    }

    /// Throws the draft away and starts over.
    pub async fn discard(&mut self) -> Result<(), DraftError> {
        self.persistence.clear_draft().await?;
        self.wizard.reset();
        self.tiers.clear();
        Ok(())
    }

    async fn persist(&self) {
        if let Err(error) = self.persistence.save_draft(self.wizard.draft()).await {
            warn!(%error, "could not save draft");
        }
    }
}
