//! Export artifacts: CSV rendering and the contained export root.

mod csv;
mod error;
mod storage;

pub use csv::{csv_escape, export_file_name, safe_base, to_csv};
pub use error::ExportError;
pub use storage::{ExportStorage, StoredExport};
