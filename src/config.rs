use crate::accounts::{AccountBackend, CsvAccountFile, DefaultAdmin, SessionAccounts};
use crate::audit::{AuditLog, MemoryAuditLog, SqliteAuditLog};
use crate::cache::{IngestCache, DEFAULT_TTL};
use crate::error::DashboardResult;
use crate::source::{LocalFolder, RecordSource};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration, read from a JSON file. Every key is optional.
///
/// ```json
/// {
///   "records_dir": "Excel",
///   "accounts_file": "usuarios.csv",
///   "audit_db": "auditoria.db",
///   "cache_ttl_secs": 5,
///   "default_admin": { "username": "admin", "password": "cambiar" },
///   "default_date_from": "2026-01-01"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder with the payment spreadsheets
    pub records_dir: PathBuf,

    /// Accounts file; `None` keeps accounts for this session only
    pub accounts_file: Option<PathBuf>,

    /// SQLite audit database; `None` keeps the audit log in memory
    pub audit_db: Option<PathBuf>,

    pub cache_ttl_secs: u64,

    pub default_admin: DefaultAdmin,

    /// Lower bound pre-filled when the date filter is switched on
    pub default_date_from: Option<NaiveDate>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            records_dir: PathBuf::from("Excel"),
            accounts_file: Some(PathBuf::from("usuarios.csv")),
            audit_db: None,
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
            default_admin: DefaultAdmin::default(),
            default_date_from: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> DashboardResult<Config> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// `load` when the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> DashboardResult<Config> {
        if path.exists() {
            Config::load(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn record_source(&self) -> Box<dyn RecordSource> {
        Box::new(LocalFolder::new(&self.records_dir))
    }

    pub fn ingest_cache(&self) -> IngestCache {
        IngestCache::new(self.record_source(), self.cache_ttl())
    }

    pub fn account_backend(&self) -> Box<dyn AccountBackend> {
        match &self.accounts_file {
            Some(path) => Box::new(CsvAccountFile::new(path)),
            None => Box::new(SessionAccounts::new()),
        }
    }

    pub fn audit_log(&self) -> DashboardResult<Box<dyn AuditLog>> {
        Ok(match &self.audit_db {
            Some(path) => Box::new(SqliteAuditLog::open(path)?),
            None => Box::new(MemoryAuditLog::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"records_dir": "/datos/pagos", "accounts_file": null}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.records_dir, PathBuf::from("/datos/pagos"));
        assert_eq!(config.accounts_file, None);
        assert_eq!(config.cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.default_admin, DefaultAdmin::default());
        assert_eq!(config.account_backend().describe(), "session");
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());

        assert!(Config::load(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Config::load(&path).is_err());
    }
}
