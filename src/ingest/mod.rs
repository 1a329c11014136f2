pub mod export;
pub mod reader;

pub use export::{export_reconciled_to_csv, export_to_csv, reconciled_to_csv, table_to_csv};
pub use reader::{read_table, read_table_from_bytes, SourceFormat};
