// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Table shapes flowing from ingestion to training
// No I/O, no async

mod canonical_table;
mod raw_table;

pub use canonical_table::{CanonicalTable, NormalizationReport};
pub use raw_table::RawTable;
