use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    ConfigStore, PromptSet, TargetDescriptor,
    error::{Result, TesterError},
};

/// On-disk shape of the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    prompts: BTreeMap<String, PromptSet>,
    #[serde(default)]
    targets: BTreeMap<String, TargetDescriptor>,
}

/// Prompt sets and targets held in memory, optionally mirrored to a JSON
/// file.
///
/// Every mutation is applied to a copy, persisted, and only then published,
/// so a failed write leaves the store unchanged. Writes replace the file via
/// rename and never leave it half written.
#[derive(Debug)]
pub struct JsonConfigStore {
    state: RwLock<StateDocument>,
    path: Option<PathBuf>,
}

impl JsonConfigStore {
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(StateDocument::default()),
            path: None,
        }
    }

    /// Load `path` if it exists; otherwise start empty and create it on the
    /// first mutation.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StateDocument>(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "state file not found; starting empty");
                StateDocument::default()
            }
            Err(err) => return Err(err.into()),
        };
        debug!(
            path = %path.display(),
            prompt_sets = state.prompts.len(),
            targets = state.targets.len(),
            "configuration state loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut StateDocument) -> T,
    ) -> Result<T> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let value = change(&mut next);
        if next != *guard {
            self.persist(&next).await?;
            *guard = next;
        }
        Ok(value)
    }

    async fn persist(&self, state: &StateDocument) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, &bytes).await?;
        tokio::fs::rename(&staging, path).await.map_err(|err| {
            TesterError::Internal(format!(
                "failed to replace state file {}: {err}",
                path.display()
            ))
        })
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    async fn list_prompt_sets(&self) -> Result<Vec<PromptSet>> {
        Ok(self.state.read().await.prompts.values().cloned().collect())
    }

    async fn get_prompt_set(&self, name: &str) -> Result<Option<PromptSet>> {
        Ok(self.state.read().await.prompts.get(name).cloned())
    }

    async fn put_prompt_set(&self, prompts: PromptSet) -> Result<()> {
        prompts.validate()?;
        self.mutate(|state| {
            state.prompts.insert(prompts.name.clone(), prompts);
        })
        .await
    }

    async fn delete_prompt_set(&self, name: &str) -> Result<bool> {
        self.mutate(|state| state.prompts.remove(name).is_some())
            .await
    }

    async fn list_targets(&self) -> Result<BTreeMap<String, TargetDescriptor>> {
        Ok(self.state.read().await.targets.clone())
    }

    async fn get_target(&self, name: &str) -> Result<Option<TargetDescriptor>> {
        Ok(self.state.read().await.targets.get(name).cloned())
    }

    async fn put_target(&self, target: TargetDescriptor) -> Result<()> {
        target.validate()?;
        self.mutate(|state| {
            state.targets.insert(target.name.clone(), target);
        })
        .await
    }

    async fn delete_target(&self, name: &str) -> Result<bool> {
        self.mutate(|state| state.targets.remove(name).is_some())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round() {
        let store = JsonConfigStore::in_memory();
        store
            .put_prompt_set(PromptSet::new("lab").with_prompt("hostname", "dut"))
            .await
            .unwrap();

        let loaded = store.get_prompt_set("lab").await.unwrap().unwrap();
        assert_eq!(loaded.prompts["hostname"], "dut");
        assert_eq!(store.list_prompt_sets().await.unwrap().len(), 1);

        assert!(store.delete_prompt_set("lab").await.unwrap());
        assert!(!store.delete_prompt_set("lab").await.unwrap());
        assert!(store.get_prompt_set("lab").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_replaces_existing_entry() {
        let store = JsonConfigStore::in_memory();
        store
            .put_target(TargetDescriptor::new("dut", "10.0.0.1:9339"))
            .await
            .unwrap();
        store
            .put_target(TargetDescriptor::new("dut", "10.0.0.2:9339"))
            .await
            .unwrap();

        let targets = store.list_targets().await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets["dut"].address, "10.0.0.2:9339");
    }

    #[tokio::test]
    async fn invalid_entries_are_rejected() {
        let store = JsonConfigStore::in_memory();
        let err = store
            .put_target(TargetDescriptor::new("dut", "no-port"))
            .await
            .unwrap_err();
        assert!(matches!(err, TesterError::InvalidInput(_)));

        let err = store
            .put_prompt_set(PromptSet::new("a/b"))
            .await
            .unwrap_err();
        assert!(matches!(err, TesterError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("gnxi.json");

        let store = JsonConfigStore::open(&path).await.unwrap();
        store
            .put_prompt_set(PromptSet::new("lab").with_file("os_file", "abc.bin"))
            .await
            .unwrap();
        store
            .put_target(TargetDescriptor::new("dut", "10.0.0.1:9339"))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonConfigStore::open(&path).await.unwrap();
        let prompts = reopened.get_prompt_set("lab").await.unwrap().unwrap();
        assert_eq!(prompts.files["os_file"], "abc.bin");
        assert!(reopened.get_target("dut").await.unwrap().is_some());

        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        assert!(!PathBuf::from(staging).exists());
    }

    #[tokio::test]
    async fn corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gnxi.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonConfigStore::open(&path).await.unwrap_err();
        assert!(matches!(err, TesterError::Serialization(_)));
    }
}
