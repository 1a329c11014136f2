pub mod currency;
pub mod filters;
pub mod insights;
pub mod opportunity;
pub mod reconciliation;
pub mod schema;

pub use currency::CurrencyTable;
pub use filters::{FilterStage, OpportunityRules, Verdict};
pub use insights::generate_insights;
pub use opportunity::OpportunityService;
pub use reconciliation::{ReconciliationService, VendorClassifier};
pub use schema::{normalize, normalize_select, SchemaMapping};
