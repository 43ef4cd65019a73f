use super::{is_reserved_name, RecordSource, SourceHandle, TableFormat};
use crate::error::{DashboardError, DashboardResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Spreadsheets in a local directory (not recursive)
pub struct LocalFolder {
    dir: PathBuf,
}

impl LocalFolder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LocalFolder { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordSource for LocalFolder {
    fn location(&self) -> String {
        self.dir.display().to_string()
    }

    fn list_sources(&self) -> DashboardResult<Vec<SourceHandle>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            DashboardError::StoreUnavailable(format!("{}: {}", self.dir.display(), e))
        })?;

        let mut handles = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", self.dir.display(), e);
                    continue;
                }
            };

            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    log::warn!("Skipping file with non UTF-8 name: {:?}", raw);
                    continue;
                }
            };

            if is_reserved_name(&name) {
                log::debug!("Skipping lock file {}", name);
                continue;
            }

            if let Some(format) = TableFormat::from_file_name(&name) {
                handles.push(SourceHandle {
                    id: name.clone(),
                    name,
                    format,
                });
            }
        }

        // read_dir order is platform-dependent
        handles.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(handles)
    }

    fn read(&self, handle: &SourceHandle) -> DashboardResult<Vec<u8>> {
        fs::read(self.dir.join(&handle.id)).map_err(|e| DashboardError::SourceUnreadable {
            name: handle.name.clone(),
            reason: e.to_string(),
        })
    }
}
