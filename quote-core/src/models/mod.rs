mod catalog;
mod draft;
mod inventory;
mod pricing_rule;
mod quote;

pub use catalog::{NewService, NewServiceOption, NewTier, OptionFieldType, Service, ServiceOption, Tier};
pub use draft::{QuoteDraft, StepValidation, UploadedFile, is_answered};
pub use inventory::{InventoryItem, NewInventoryItem, StockStatus};
pub use pricing_rule::PricingRule;
pub use quote::{CreatedQuote, QuoteSubmission};
