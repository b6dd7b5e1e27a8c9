use std::time::Duration;

pub fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| parse_csv(&raw))
}

pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Parse a humantime duration where `off`, `none`, `disabled` and any zero
/// duration mean "no limit".
pub fn parse_limit(raw: &str) -> Result<Option<Duration>, humantime::DurationError> {
    let trimmed = raw.trim();
    if matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "off" | "none" | "disabled"
    ) {
        return Ok(None);
    }
    let duration = humantime::parse_duration(trimmed)?;
    Ok((!duration.is_zero()).then_some(duration))
}
