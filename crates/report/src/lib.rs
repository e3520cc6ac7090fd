pub mod row;
pub mod writers;

pub use row::{map_repo, MISSING_FIELD, REPORT_FIELDS};
pub use writers::{write_csv, write_json, CsvSchemaError};
