use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Generated id used to reference the file from prompt sets and targets.
    pub name: String,
    pub size: u64,
}

/// Storage for uploaded test-definition files (certificates, images, ...).
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `contents` under a generated name. The extension of
    /// `original_name`, when present, is kept.
    async fn store(
        &self,
        original_name: Option<&str>,
        contents: &[u8],
    ) -> Result<StoredFile>;

    /// Returns `false` when the file did not exist.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Readable path of a stored file, or `NotFound`.
    async fn resolve(&self, name: &str) -> Result<PathBuf>;
}
