//! FILENAME: app/server/src/drive.rs
//! PURPOSE: The opaque remote-workbook interface.
//! CONTEXT: The portal can replace its primary contracts dataset from a
//! remote file provider. The transport is an external collaborator; the
//! engine only sees this trait. The shipped implementation resolves the
//! configured file id inside a local sync directory kept up to date by the
//! deployment; tests substitute an in-memory provider.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Atualização remota não está configurada.")]
    Disabled,

    #[error("Falha ao obter a planilha remota: {0}")]
    Unavailable(String),
}

/// Fetches the primary workbook: returns the filename (used to pick the
/// decoder) and the raw bytes.
pub trait WorkbookProvider: Send + Sync {
    fn fetch(&self, file_id: &str) -> Result<(String, Vec<u8>), FetchError>;
}

/// File-system-backed provider: `file_id` names a file inside the sync
/// directory.
pub struct SyncDirProvider {
    root: PathBuf,
}

impl SyncDirProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SyncDirProvider { root: root.into() }
    }
}

impl Default for SyncDirProvider {
    fn default() -> Self {
        SyncDirProvider::new("drive_sync")
    }
}

impl WorkbookProvider for SyncDirProvider {
    fn fetch(&self, file_id: &str) -> Result<(String, Vec<u8>), FetchError> {
        let name = std::path::Path::new(file_id)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FetchError::Unavailable(format!("identificador inválido: {}", file_id)))?;
        let path = self.root.join(name);
        let bytes =
            std::fs::read(&path).map_err(|e| FetchError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok((name.to_string(), bytes))
    }
}

/// In-memory provider for tests.
pub struct StaticProvider {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl WorkbookProvider for StaticProvider {
    fn fetch(&self, _file_id: &str) -> Result<(String, Vec<u8>), FetchError> {
        Ok((self.filename.clone(), self.bytes.clone()))
    }
}
