pub mod csv;

pub use csv::{detect_columns, import_csv, CsvColumnMapping, CsvError, CsvImportProfile};
