//! Shared config directory for KeySync
//!
//! Resolves the KeySync config directory (~/.config/keysync/ by default,
//! or `$KEYSYNC_CONFIG_DIR` when set) and provides JSON load/save helpers
//! for the small files kept there (settings, tuning, the deck database).
//!
//! Call [`init`] at application startup to bootstrap the directory.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable that relocates the config directory
pub const CONFIG_DIR_ENV: &str = "KEYSYNC_CONFIG_DIR";

/// Initialize the KeySync config directory.
///
/// Creates the directory if it doesn't exist and returns its path.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the KeySync config directory
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|p| p.join("keysync"))
}

/// Get the path to a file within the config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Load a JSON file from the config directory, or `T::default()` if it is missing
pub fn load_json_or_default<T: DeserializeOwned + Default>(filename: &str) -> Result<T> {
    match config_path(filename) {
        Some(path) if path.exists() => load_json_file(&path),
        _ => Ok(T::default()),
    }
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Ensure the config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// Save a value as JSON to a file in the config directory
pub fn save_json<T: serde::Serialize>(filename: &str, value: &T) -> Result<()> {
    let dir = ensure_config_dir()?;
    save_json_file(&dir.join(filename), value)
}

/// Save a value as pretty JSON to an arbitrary path
pub fn save_json_file<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        enabled: bool,
    }

    #[test]
    fn test_config_path_joins_filename() {
        let path = config_path("test.json");
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("test.json"));
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        let value = Sample {
            name: "keysync".to_string(),
            enabled: true,
        };
        save_json_file(&path, &value).unwrap();

        let loaded: Sample = load_json_file(&path).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_load_json_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_json_file::<Sample>(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
