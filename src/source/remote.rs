use super::{is_reserved_name, RecordSource, SourceHandle, TableFormat};
use crate::error::{DashboardError, DashboardResult};
use serde::{Deserialize, Serialize};

/// File entry as returned by a cloud file-listing API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Thin seam over a cloud file store. Authentication lives in the
/// implementation, outside this crate.
pub trait FolderClient {
    fn list_folder(&self, folder_id: &str) -> anyhow::Result<Vec<RemoteFile>>;

    fn download(&self, file_id: &str) -> anyhow::Result<Vec<u8>>;
}

/// Spreadsheets inside one remote folder
pub struct RemoteFolder<C: FolderClient> {
    client: C,
    folder_id: String,
}

impl<C: FolderClient> RemoteFolder<C> {
    pub fn new(client: C, folder_id: impl Into<String>) -> Self {
        RemoteFolder {
            client,
            folder_id: folder_id.into(),
        }
    }
}

impl<C: FolderClient> RecordSource for RemoteFolder<C> {
    fn location(&self) -> String {
        format!("remote folder {}", self.folder_id)
    }

    fn list_sources(&self) -> DashboardResult<Vec<SourceHandle>> {
        let files = self
            .client
            .list_folder(&self.folder_id)
            .map_err(|e| DashboardError::StoreUnavailable(format!("{}: {:#}", self.location(), e)))?;

        let handles = files
            .into_iter()
            .filter(|file| !is_reserved_name(&file.name))
            .filter_map(|file| {
                let format = TableFormat::from_mime_type(&file.mime_type)
                    .or_else(|| TableFormat::from_file_name(&file.name))?;
                Some(SourceHandle {
                    id: file.id,
                    name: file.name,
                    format,
                })
            })
            .collect();

        Ok(handles)
    }

    fn read(&self, handle: &SourceHandle) -> DashboardResult<Vec<u8>> {
        self.client
            .download(&handle.id)
            .map_err(|e| DashboardError::SourceUnreadable {
                name: handle.name.clone(),
                reason: format!("{:#}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MIME_CSV, MIME_XLSX};
    use std::collections::HashMap;

    struct FakeDrive {
        files: Vec<RemoteFile>,
        content: HashMap<String, Vec<u8>>,
    }

    impl FolderClient for FakeDrive {
        fn list_folder(&self, folder_id: &str) -> anyhow::Result<Vec<RemoteFile>> {
            if folder_id != "pagos" {
                anyhow::bail!("folder not found");
            }
            Ok(self.files.clone())
        }

        fn download(&self, file_id: &str) -> anyhow::Result<Vec<u8>> {
            self.content
                .get(file_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("403 forbidden"))
        }
    }

    fn file(id: &str, name: &str, mime: &str) -> RemoteFile {
        RemoteFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime.to_string(),
        }
    }

    fn drive() -> FakeDrive {
        FakeDrive {
            files: vec![
                file("1", "enero.xlsx", MIME_XLSX),
                file("2", "logo.png", "image/png"),
                file("3", "~$enero.xlsx", MIME_XLSX),
                file("4", "febrero.csv", MIME_CSV),
                file("5", "marzo.xlsx", "application/octet-stream"),
            ],
            content: HashMap::from([("4".to_string(), b"monto\n10\n".to_vec())]),
        }
    }

    #[test]
    fn test_filters_by_mime_type_and_lock_prefix() {
        let folder = RemoteFolder::new(drive(), "pagos");
        let handles = folder.list_sources().unwrap();
        let ids: Vec<&str> = handles.iter().map(|h| h.id.as_str()).collect();

        assert_eq!(ids, vec!["1", "4", "5"], "keeps API order");
        assert_eq!(handles[1].format, TableFormat::Csv);
    }

    #[test]
    fn test_list_failure_and_download_failure() {
        let folder = RemoteFolder::new(drive(), "otra");
        assert!(matches!(
            folder.list_sources(),
            Err(DashboardError::StoreUnavailable(_))
        ));

        let folder = RemoteFolder::new(drive(), "pagos");
        let handles = folder.list_sources().unwrap();
        assert!(folder.read(&handles[1]).is_ok());
        assert!(matches!(
            folder.read(&handles[0]),
            Err(DashboardError::SourceUnreadable { .. })
        ));
    }

    #[test]
    fn test_remote_file_uses_api_field_names() {
        let json = r#"{"id":"9","name":"abril.xlsx","mimeType":"text/csv"}"#;
        let parsed: RemoteFile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.mime_type, MIME_CSV);
    }
}
