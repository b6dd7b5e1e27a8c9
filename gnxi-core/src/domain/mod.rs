pub mod catalog;
pub mod prompts;
pub mod targets;

use crate::error::{Result, TesterError};

/// Names key stores and files on disk, so they must stay single path segments.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TesterError::invalid(format!("{kind} name must not be empty")));
    }
    if trimmed != name {
        return Err(TesterError::invalid(format!(
            "{kind} name must not have leading or trailing whitespace"
        )));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".."
    {
        return Err(TesterError::invalid(format!(
            "{kind} name '{name}' must be a single path segment"
        )));
    }
    Ok(())
}
