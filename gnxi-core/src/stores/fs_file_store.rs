use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    FileStore, StoredFile,
    domain::validate_name,
    error::{ResourceKind, Result, TesterError},
};

const MAX_EXTENSION_LEN: usize = 16;

/// Uploaded files kept flat under one directory with generated names.
#[derive(Debug, Clone)]
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    /// Create `root` if needed and anchor the store at its canonical path.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        tokio::fs::create_dir_all(root).await?;
        let root = tokio::fs::canonicalize(root).await?;
        info!(root = %root.display(), "file store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name("file", name)?;
        if name.contains("..") {
            return Err(TesterError::invalid(format!(
                "file name '{name}' must not contain '..'"
            )));
        }
        Ok(self.root.join(name))
    }
}

fn generated_name(original_name: Option<&str>) -> String {
    let id = Uuid::new_v4().simple().to_string();
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });

    match extension {
        Some(ext) => format!("{id}.{}", ext.to_ascii_lowercase()),
        None => id,
    }
}

#[async_trait]
impl FileStore for FsFileStore {
    async fn store(
        &self,
        original_name: Option<&str>,
        contents: &[u8],
    ) -> Result<StoredFile> {
        let name = generated_name(original_name);
        let path = self.path_for(&name)?;
        tokio::fs::write(&path, contents).await?;
        debug!(%name, size = contents.len(), "stored uploaded file");

        Ok(StoredFile {
            name,
            size: contents.len() as u64,
        })
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(TesterError::not_found(ResourceKind::File, name)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(TesterError::not_found(ResourceKind::File, name))
            }
            Err(err) => Err(err.into()),
        }
    }
}
