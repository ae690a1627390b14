use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SettingsError;
use crate::zoom::{DEFAULT_FILL_RATIO, DEFAULT_PERCENT_CACHE_SIZE, DEFAULT_ZOOM_STEP, FitMode};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "spreadview";

const DEFAULT_ZOOM_REPORT_DELAY_MS: u64 = 200;
const DEFAULT_SCROLL_SETTLE_DELAY_MS: u64 = 400;
/// Upper bound for either timer delay
const MAX_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Quiet period before a zoom change is reported to the host
    #[serde(default = "default_zoom_report_delay_ms")]
    pub zoom_report_delay_ms: u64,

    /// Inactivity after the last scroll before the gesture counts as over
    #[serde(default = "default_scroll_settle_delay_ms")]
    pub scroll_settle_delay_ms: u64,

    /// Share of the surface covered at default zoom, in (0, 1]
    #[serde(default = "default_fill_ratio")]
    pub fill_ratio: f64,

    /// Percentage points per zoom in/out step
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,

    #[serde(default)]
    pub fit_mode: FitMode,

    #[serde(default = "default_percent_cache_size")]
    pub percent_cache_size: usize,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_zoom_report_delay_ms() -> u64 {
    DEFAULT_ZOOM_REPORT_DELAY_MS
}

fn default_scroll_settle_delay_ms() -> u64 {
    DEFAULT_SCROLL_SETTLE_DELAY_MS
}

fn default_fill_ratio() -> f64 {
    DEFAULT_FILL_RATIO
}

fn default_zoom_step() -> f64 {
    DEFAULT_ZOOM_STEP
}

fn default_percent_cache_size() -> usize {
    DEFAULT_PERCENT_CACHE_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            zoom_report_delay_ms: default_zoom_report_delay_ms(),
            scroll_settle_delay_ms: default_scroll_settle_delay_ms(),
            fill_ratio: default_fill_ratio(),
            zoom_step: default_zoom_step(),
            fit_mode: FitMode::default(),
            percent_cache_size: default_percent_cache_size(),
        }
    }
}

impl Settings {
    /// Session configuration, with out-of-range values replaced by defaults
    pub fn reader_config(&self) -> ReaderConfig {
        let fill_ratio = if self.fill_ratio > 0.0 && self.fill_ratio <= 1.0 {
            self.fill_ratio
        } else {
            warn!(
                "fill_ratio {} outside (0, 1], using {DEFAULT_FILL_RATIO}",
                self.fill_ratio
            );
            DEFAULT_FILL_RATIO
        };
        let zoom_step = if self.zoom_step.is_finite() && self.zoom_step > 0.0 {
            self.zoom_step
        } else {
            warn!(
                "zoom_step {} is not positive, using {DEFAULT_ZOOM_STEP}",
                self.zoom_step
            );
            DEFAULT_ZOOM_STEP
        };

        ReaderConfig {
            zoom_report_delay: capped_delay("zoom_report_delay_ms", self.zoom_report_delay_ms),
            scroll_settle_delay: capped_delay(
                "scroll_settle_delay_ms",
                self.scroll_settle_delay_ms,
            ),
            fill_ratio,
            zoom_step,
            fit_mode: self.fit_mode,
            percent_cache_size: self.percent_cache_size,
        }
    }
}

fn capped_delay(name: &str, millis: u64) -> Duration {
    if millis > MAX_DELAY_MS {
        warn!("{name} {millis} exceeds {MAX_DELAY_MS}, capping");
    }
    Duration::from_millis(millis.min(MAX_DELAY_MS))
}

/// Runtime configuration of a viewer session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderConfig {
    pub zoom_report_delay: Duration,
    pub scroll_settle_delay: Duration,
    pub fill_ratio: f64,
    pub zoom_step: f64,
    pub fit_mode: FitMode,
    pub percent_cache_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Settings::default().reader_config()
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `explicit`, or from the platform config directory.
///
/// An explicit path must exist. A missing file in the config directory means
/// defaults.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    if let Some(path) = explicit {
        return load_settings_from_path(path);
    }

    match preferred_config_path() {
        Some(path) if path.exists() => load_settings_from_path(&path),
        Some(path) => {
            info!("Settings file not found at {path:?}, using defaults");
            Ok(Settings::default())
        }
        None => {
            warn!("Could not determine config directory, using default settings");
            Ok(Settings::default())
        }
    }
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut settings: Settings =
        serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Loaded settings from {path:?}");

    if settings.version < CURRENT_VERSION {
        migrate_settings(&mut settings);
    }
    Ok(settings)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let mut content = String::from(SETTINGS_HEADER);
    content.push_str(&serde_yaml::to_string(settings)?);

    fs::write(path, content).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Saved settings to {path:?}");
    Ok(())
}

const SETTINGS_HEADER: &str = r#"# spreadview settings
#
# zoom_report_delay_ms    quiet period before zoom changes reach the host
# scroll_settle_delay_ms  inactivity that ends a scroll gesture
# fill_ratio              share of the surface covered at default zoom
# zoom_step               percentage points per zoom in/out
# fit_mode                bounds | vertical | horizontal
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_fields_use_defaults() {
        let settings: Settings = serde_yaml::from_str("zoom_step: 5\n").unwrap();
        assert_eq!(settings.zoom_step, 5.0);
        assert_eq!(settings.zoom_report_delay_ms, 200);
        assert_eq!(settings.scroll_settle_delay_ms, 400);
        assert_eq!(settings.fit_mode, FitMode::Bounds);
        assert_eq!(settings.version, CURRENT_VERSION);
    }

    #[test]
    fn save_then_load_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let settings = Settings {
            fit_mode: FitMode::Vertical,
            zoom_report_delay_ms: 150,
            ..Settings::default()
        };

        save_settings_to_file(&settings, &path).unwrap();
        let loaded = load_settings(Some(&path)).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = load_settings(Some(&dir.path().join("absent.yaml")));
        assert!(matches!(result, Err(SettingsError::Read { .. })));
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "fill_ratio: [1, 2").unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn old_version_is_migrated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 0\n").unwrap();
        assert_eq!(load_settings_from_path(&path).unwrap().version, CURRENT_VERSION);
    }

    #[test]
    fn reader_config_rejects_out_of_range_values() {
        let settings = Settings {
            fill_ratio: 1.5,
            zoom_step: -3.0,
            ..Settings::default()
        };
        let config = settings.reader_config();
        assert_eq!(config.fill_ratio, DEFAULT_FILL_RATIO);
        assert_eq!(config.zoom_step, DEFAULT_ZOOM_STEP);
        assert_eq!(config.zoom_report_delay, Duration::from_millis(200));
    }

    #[test]
    fn reader_config_caps_huge_delays() {
        let settings: Settings =
            serde_yaml::from_str("scroll_settle_delay_ms: 18446744073709551615\n").unwrap();
        let config = settings.reader_config();
        assert_eq!(config.scroll_settle_delay, Duration::from_millis(MAX_DELAY_MS));
        assert_eq!(config.zoom_report_delay, Duration::from_millis(200));
    }
}
