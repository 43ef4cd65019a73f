// 📂 Record Source Adapters
// Enumerate spreadsheet files from a backing store and hand out their bytes.
//
// Two stores are supported:
// - LocalFolder: a directory on disk
// - RemoteFolder: a cloud folder reached through a FolderClient

pub mod local;
pub mod remote;

pub use local::LocalFolder;
pub use remote::{FolderClient, RemoteFile, RemoteFolder};

use crate::error::DashboardResult;
use serde::{Deserialize, Serialize};

/// Name prefixes of lock/temporary files written by office suites
pub const RESERVED_PREFIXES: [&str; 2] = ["~$", ".~lock"];

pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_XLS: &str = "application/vnd.ms-excel";
pub const MIME_CSV: &str = "text/csv";

/// How the raw bytes of a source should be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableFormat {
    /// xlsx / xls / xlsm / ods, read with calamine
    Workbook,
    Csv,
}

impl TableFormat {
    pub fn from_file_name(name: &str) -> Option<TableFormat> {
        let extension = name.rsplit_once('.')?.1.to_lowercase();

        match extension.as_str() {
            "xlsx" | "xls" | "xlsm" | "ods" => Some(TableFormat::Workbook),
            "csv" => Some(TableFormat::Csv),
            _ => None,
        }
    }

    pub fn from_mime_type(mime_type: &str) -> Option<TableFormat> {
        match mime_type {
            MIME_XLSX | MIME_XLS => Some(TableFormat::Workbook),
            MIME_CSV => Some(TableFormat::Csv),
            _ => None,
        }
    }
}

/// One readable spreadsheet in a backing store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHandle {
    /// Store-specific key used to fetch the content (file name or remote id)
    pub id: String,

    /// Display name, recorded as provenance on every row
    pub name: String,

    pub format: TableFormat,
}

/// Lock files like `~$pagos.xlsx` must never be ingested
pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// RecordSource - the only thing the ingestion pipeline knows about storage
pub trait RecordSource {
    /// Human-readable location for messages ("/data/excel", "folder 1AbC")
    fn location(&self) -> String;

    /// Spreadsheet files available in the store, in enumeration order.
    ///
    /// Fails only when the store itself is unreachable; a single bad entry
    /// is logged and left out.
    fn list_sources(&self) -> DashboardResult<Vec<SourceHandle>>;

    /// Raw bytes of one source
    fn read(&self, handle: &SourceHandle) -> DashboardResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(TableFormat::from_file_name("Pagos Enero.XLSX"), Some(TableFormat::Workbook));
        assert_eq!(TableFormat::from_file_name("viejo.xls"), Some(TableFormat::Workbook));
        assert_eq!(TableFormat::from_file_name("export.csv"), Some(TableFormat::Csv));
        assert_eq!(TableFormat::from_file_name("notas.txt"), None);
        assert_eq!(TableFormat::from_file_name("sin_extension"), None);

        assert_eq!(TableFormat::from_mime_type(MIME_XLSX), Some(TableFormat::Workbook));
        assert_eq!(TableFormat::from_mime_type("image/png"), None);
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name("~$pagos.xlsx"));
        assert!(is_reserved_name(".~lock.pagos.xlsx#"));
        assert!(!is_reserved_name("pagos.xlsx"));
    }
}
