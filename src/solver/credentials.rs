use crate::ConfigError;
use std::path::Path;

/// Reads the solver API key from a single-line file
///
/// Surrounding whitespace is trimmed. An unreadable or blank file is an error.
pub fn read_credentials(path: &Path) -> Result<String, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Credentials {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let key = raw.trim();
    if key.is_empty() {
        return Err(ConfigError::Credentials {
            path: path.display().to_string(),
            reason: "file is empty".to_string(),
        });
    }

    Ok(key.to_string())
}
