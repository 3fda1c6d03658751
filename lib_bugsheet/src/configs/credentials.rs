use super::ConfigError;
use std::fs;
use std::path::Path;

/// Reads an API key from `path`, stripping trailing line endings.
///
/// Only `\r` and `\n` are removed so keys that legitimately end in other
/// whitespace survive untouched.
pub fn read_api_key(path: &Path) -> Result<String, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let key = raw.trim_end_matches(['\r', '\n']);
    if key.is_empty() {
        return Err(ConfigError::EmptyCredential(path.to_path_buf()));
    }

    Ok(key.to_string())
}
