use std::env;
use std::path::PathBuf;

use crate::geo_calibration::{
    CalibrationOptions, DEFAULT_JITTER, DEFAULT_PADDING, MAP_HEIGHT, MAP_WIDTH,
};

const APP_DIR: &str = "agency_desk";

/// Runtime settings read from `AGENCY_*` environment variables (after `.env.local` and
/// `.env` are loaded by the binaries).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: Option<PathBuf>,
    pub calibration_padding: f64,
    pub calibration_jitter: f64,
    pub clamp_to_map: bool,
    pub remote_url: Option<String>,
    pub remote_key: Option<String>,
    pub log_file: Option<PathBuf>,
    pub tick_millis: u64,
    pub board_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            calibration_padding: DEFAULT_PADDING,
            calibration_jitter: DEFAULT_JITTER,
            clamp_to_map: true,
            remote_url: None,
            remote_key: None,
            log_file: None,
            tick_millis: 120,
            board_name: "default".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            db_path: non_empty("AGENCY_DB_PATH").map(PathBuf::from),
            calibration_padding: non_empty("AGENCY_CALIBRATION_PADDING")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(defaults.calibration_padding)
                .clamp(0.0, 400.0),
            calibration_jitter: non_empty("AGENCY_CALIBRATION_JITTER")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(defaults.calibration_jitter)
                .clamp(0.0, 50.0),
            clamp_to_map: non_empty("AGENCY_CLAMP_TO_MAP")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.clamp_to_map),
            remote_url: non_empty("AGENCY_REMOTE_URL").map(|v| v.trim_end_matches('/').to_string()),
            remote_key: non_empty("AGENCY_REMOTE_KEY"),
            log_file: non_empty("AGENCY_LOG_FILE").map(PathBuf::from),
            tick_millis: non_empty("AGENCY_TICK_MILLIS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.tick_millis)
                .max(30),
            board_name: non_empty("AGENCY_BOARD_NAME").unwrap_or(defaults.board_name),
        }
    }

    pub fn calibration_options(&self) -> CalibrationOptions {
        CalibrationOptions {
            padding: self.calibration_padding,
            jitter: self.calibration_jitter,
            map_extent: self.clamp_to_map.then_some((MAP_WIDTH, MAP_HEIGHT)),
        }
    }
}

pub fn app_data_dir() -> Option<PathBuf> {
    // Prefer XDG data.
    if let Ok(base) = env::var("XDG_DATA_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".local").join("share").join(APP_DIR))
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config_from(&[]), AppConfig::default());
    }

    #[test]
    fn values_are_parsed_and_clamped() {
        let cfg = config_from(&[
            ("AGENCY_CALIBRATION_PADDING", "9000"),
            ("AGENCY_CALIBRATION_JITTER", "nope"),
            ("AGENCY_CLAMP_TO_MAP", "off"),
            ("AGENCY_REMOTE_URL", "https://db.example.com/ "),
            ("AGENCY_TICK_MILLIS", "1"),
        ]);
        assert_eq!(cfg.calibration_padding, 400.0);
        assert_eq!(cfg.calibration_jitter, DEFAULT_JITTER);
        assert!(!cfg.clamp_to_map);
        assert_eq!(cfg.calibration_options().map_extent, None);
        assert_eq!(cfg.remote_url.as_deref(), Some("https://db.example.com"));
        assert_eq!(cfg.tick_millis, 30);
    }
}
