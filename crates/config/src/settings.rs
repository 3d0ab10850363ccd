// Application settings
// Loaded from ~/.config/statgrid/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "statgrid";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Compute pool
    #[serde(rename = "compute.workers")]
    pub compute_workers: Option<usize>, // None = one per core, capped

    #[serde(rename = "compute.timeoutSecs")]
    pub compute_timeout_secs: u64, // 0 = wait forever

    // Audit trail
    #[serde(rename = "audit.database")]
    pub audit_database: Option<PathBuf>, // None = the dataset file

    // Logging
    #[serde(rename = "log.level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compute_workers: None,
            compute_timeout_secs: 60,
            audit_database: None,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// `<config dir>/statgrid/settings.json`
    pub fn config_path() -> PathBuf {
        config_dir().join("settings.json")
    }

    /// Read the per-user settings, writing a commented template on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load from an explicit file. Unreadable or malformed files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => {
                // Whole-line // comments are allowed
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let text = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, text).map_err(|e| e.to_string())
    }

    /// Per-dispatch timeout, `None` when disabled.
    pub fn compute_timeout(&self) -> Option<Duration> {
        (self.compute_timeout_secs > 0).then(|| Duration::from_secs(self.compute_timeout_secs))
    }

    /// Commented template listing every key with its default.
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Compute pool: worker threads (null = one per core, at most 8)
    "compute.workers": null,
    // Seconds before a dispatched analysis is cancelled (0 = never)
    "compute.timeoutSecs": 60,

    // Audit trail database (null = record into the analysed dataset file)
    "audit.database": null,

    // Log filter when RUST_LOG is unset: error, warn, info, debug, trace
    "log.level": "info"
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }

}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dotted_keys_with_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
    // two workers
    "compute.workers": 2,
    "compute.timeoutSecs": 0,
    "audit.database": "/tmp/trail.sgrid"
}"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.compute_workers, Some(2));
        assert_eq!(settings.compute_timeout(), None);
        assert_eq!(settings.audit_database, Some(PathBuf::from("/tmp/trail.sgrid")));
        // Unspecified keys keep their defaults
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            compute_workers: Some(3),
            compute_timeout_secs: 5,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.compute_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_default_template_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        Settings::default().create_default_file(&path);
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
