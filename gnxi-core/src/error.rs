use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Kinds of named resources the tester manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    PromptSet,
    Target,
    File,
    Test,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::PromptSet => "prompt set",
            ResourceKind::Target => "target",
            ResourceKind::File => "file",
            ResourceKind::Test => "test",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum TesterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} not found: {name}")]
    NotFound { kind: ResourceKind, name: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TesterError {
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        TesterError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        TesterError::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TesterError>;
