use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{PromptSet, TargetDescriptor, error::Result};

/// Keyed store of prompt sets and targets.
///
/// The run controller only reads through this trait; the HTTP surface owns
/// the mutations.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn list_prompt_sets(&self) -> Result<Vec<PromptSet>>;

    async fn get_prompt_set(&self, name: &str) -> Result<Option<PromptSet>>;

    /// Insert or replace a prompt set keyed by its name.
    async fn put_prompt_set(&self, prompts: PromptSet) -> Result<()>;

    /// Returns `false` when no prompt set with that name existed.
    async fn delete_prompt_set(&self, name: &str) -> Result<bool>;

    async fn list_targets(&self) -> Result<BTreeMap<String, TargetDescriptor>>;

    async fn get_target(&self, name: &str) -> Result<Option<TargetDescriptor>>;

    /// Insert or replace a target keyed by its name.
    async fn put_target(&self, target: TargetDescriptor) -> Result<()>;

    /// Returns `false` when no target with that name existed.
    async fn delete_target(&self, name: &str) -> Result<bool>;
}
