use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Named collection of test input parameters.
///
/// `prompts` holds literal values; `files` maps a parameter name to the id of
/// an uploaded file whose on-disk path is substituted at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    pub name: String,
    #[serde(default)]
    pub prompts: BTreeMap<String, String>,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl PromptSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompts: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_prompt(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.prompts.insert(key.into(), value.into());
        self
    }

    pub fn with_file(
        mut self,
        key: impl Into<String>,
        file_id: impl Into<String>,
    ) -> Self {
        self.files.insert(key.into(), file_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        super::validate_name("prompt set", &self.name)?;
        for file_id in self.files.values() {
            super::validate_name("file", file_id)?;
        }
        Ok(())
    }
}
