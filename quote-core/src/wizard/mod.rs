//! The five-step quote wizard: step gating, upload tracking, and the session
//! that ties the wizard to the backend and draft storage.

mod gate;
mod session;
mod step;
mod upload;

pub use gate::{QuoteWizard, StepBlocked};
pub use session::{SubmitError, WizardSession};
pub use step::WizardStep;
pub use upload::{PendingUpload, UploadReport, UploadTracker, upload_all};
