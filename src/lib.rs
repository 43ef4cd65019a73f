// Conciliación de Pagos - Core Library
// Exposes all modules for use in the CLI, the terminal dashboard, and tests

pub mod error;
pub mod record;
pub mod normalize;
pub mod source;
pub mod ingest;
pub mod cache;
pub mod filter;
pub mod summary;
pub mod audit;
pub mod accounts;
pub mod session;
pub mod dashboard;
pub mod export;
pub mod config;

// Re-export commonly used types
pub use error::{DashboardError, DashboardResult};
pub use record::{Bank, Field, FieldValue, Record, RecordSet};
pub use normalize::{normalize_amount, normalize_bank, normalize_date};
pub use source::{
    FolderClient, LocalFolder, RecordSource, RemoteFile, RemoteFolder,
    SourceHandle, TableFormat,
};
pub use ingest::{ingest, IngestOutcome, SourceFailure};
pub use cache::IngestCache;
pub use filter::{apply, distinct_values, Condition, Criterion, FilterSet};
pub use summary::{format_currency, format_date, summarize, truncate, Summary};
pub use audit::{AuditEntry, AuditLog, MemoryAuditLog, SqliteAuditLog};
pub use accounts::{
    Account, AccountBackend, AccountStore, CsvAccountFile, DefaultAdmin,
    Permission, SessionAccounts,
};
pub use session::Session;
pub use dashboard::{Dashboard, DashboardView, FilterOptions};
pub use export::export_csv;
pub use config::Config;
