pub mod handlers;

pub use handlers::{health_check, open_po, open_po_csv, opportunity, opportunity_csv, AppState};
