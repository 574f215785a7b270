//! Platform-specific paths for relay profiles.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/sibuf/` (Linux),
//!   `~/Library/Application Support/sibuf/` (macOS), `%APPDATA%\sibuf\` (Windows)
//! - **User profiles**: `profiles/` under the user config directory
//!
//! # Example
//!
//! ```rust,no_run
//! use sibuf_config::paths;
//!
//! // Find a profile by name or path
//! if let Some(path) = paths::find_profile("field-day") {
//!     println!("Found profile at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "sibuf";

/// Subdirectory name for profiles.
const PROFILES_SUBDIR: &str = "profiles";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific profiles directory.
pub fn user_profiles_dir() -> PathBuf {
    user_config_dir().join(PROFILES_SUBDIR)
}

/// Find a profile file by name.
///
/// Searches in the following order:
/// 1. The name as a path (absolute or relative)
/// 2. User profiles directory, with `.toml` appended if missing
pub fn find_profile(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }
    find_profile_in(&user_profiles_dir(), name)
}

/// Looks for `name` (with or without `.toml`) directly inside `dir`.
pub fn find_profile_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{}.toml", name)
    };
    let path = dir.join(filename);
    path.is_file().then_some(path)
}

/// Ensure the user profiles directory exists.
///
/// Creates the directory and any parent directories if they don't exist.
pub fn ensure_user_profiles_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_profiles_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }

    Ok(dir)
}

/// List all profile files in the user profiles directory.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_user_profiles() -> Vec<PathBuf> {
    list_profiles_in(&user_profiles_dir())
}

/// List `.toml` files in `dir`, sorted by path.
pub fn list_profiles_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut profiles: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    profiles.sort();
    profiles
}

/// Get the profile name from a file path (the file stem).
///
/// # Example
///
/// ```rust
/// use sibuf_config::paths::profile_name_from_path;
/// use std::path::Path;
///
/// let name = profile_name_from_path(Path::new("/path/to/field-day.toml"));
/// assert_eq!(name, Some("field-day".to_string()));
/// ```
pub fn profile_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_dir_under_config_dir() {
        let config = user_config_dir();
        let profiles = user_profiles_dir();
        assert!(profiles.starts_with(&config));
        assert!(config.ends_with("sibuf"));
    }

    #[test]
    fn test_find_and_list_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.toml"), "name = \"b\"").unwrap();
        std::fs::write(dir.path().join("a.toml"), "name = \"a\"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let listed = list_profiles_in(dir.path());
        let names: Vec<_> = listed
            .iter()
            .filter_map(|p| profile_name_from_path(p))
            .collect();
        assert_eq!(names, ["a", "b"]);

        assert!(find_profile_in(dir.path(), "a").is_some());
        assert!(find_profile_in(dir.path(), "a.toml").is_some());
        assert!(find_profile_in(dir.path(), "notes").is_none());
    }

    #[test]
    fn test_list_missing_dir() {
        assert!(list_profiles_in(Path::new("/definitely/not/here")).is_empty());
    }
}
