// ABOUTME: XDG Base Directory paths for config and data storage
// ABOUTME: Provides standardized locations for the config file and the Matrix state store

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application identifier for XDG directories
const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "gordy";
const APPLICATION: &str = "gordy";

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// Get the data directory path (e.g., ~/.local/share/gordy/)
/// Falls back to ./data if XDG directories unavailable
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Root of the per-account state stores (sync token, crypto keys)
pub fn store_dir() -> PathBuf {
    data_dir().join("store")
}

/// Get the config directory path (e.g., ~/.config/gordy/)
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Convert an account identifier to a filesystem-safe slug
pub fn slugify(s: &str) -> String {
    s.trim_start_matches('@')
        .replace(':', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '.' || *c == '-')
        .collect()
}
