pub mod open_po;
pub mod opportunity;
pub mod result;
pub mod table;

pub use open_po::{BenchmarkLine, OpenPoLine, ReconciledLine, VendorGroup};
pub use opportunity::{InsightsSummary, OpportunityRecord, ProcurementLine, RankedEntry};
pub use result::{OpportunityReport, PipelineWarning, ReconciliationReport};
pub use table::{Cell, Table};
