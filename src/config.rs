//! Configuration loading (§6, §10.3).
//!
//! Loading config *over the admin HTTP surface* is out of scope (§1); this module still owns
//! the `Settings` type and its file-based (de)serialization, since C3/C5/C7 consume it directly.
//! Unknown keys are rejected via `deny_unknown_fields`, matching the donor's pattern of loading
//! `.nefaxer.toml` into a typed struct (`utils::nefaxer_toml::NefaxerToml`) rather than a loose map.

use crate::error::ConfigError;
use crate::types::{ModeConfig, PolicyMode, Thresholds, Weights};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub mode: PolicyMode,
    #[serde(default)]
    pub blacklist: Vec<String>,
    pub modes: HashMap<PolicyModeKey, ModeConfig>,
}

/// `HashMap` key wrapper so the `modes` object's string keys deserialize straight into
/// [`PolicyMode`] without an intermediate `HashMap<String, ModeConfig>` pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyModeKey {
    Default,
    Eco,
    Super,
}

impl From<PolicyModeKey> for PolicyMode {
    fn from(k: PolicyModeKey) -> Self {
        match k {
            PolicyModeKey::Default => PolicyMode::Default,
            PolicyModeKey::Eco => PolicyMode::Eco,
            PolicyModeKey::Super => PolicyMode::Super,
        }
    }
}

impl Settings {
    /// Load and parse the JSON config at `path`. Captured as an immutable snapshot by the
    /// caller at the start of a tick (§5, §9); this function performs no caching itself.
    pub fn load(path: &Path) -> Result<Settings, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Mode config for `mode`, or the configured default mode's config as a fallback, mirroring
    /// the donor settings' `get_settings_for_mode` behaviour of falling back to `"default"`.
    pub fn mode_config(&self, mode: PolicyMode) -> Result<ModeConfig, ConfigError> {
        let key = match mode {
            PolicyMode::Default => PolicyModeKey::Default,
            PolicyMode::Eco => PolicyModeKey::Eco,
            PolicyMode::Super => PolicyModeKey::Super,
        };
        self.modes
            .get(&key)
            .copied()
            .ok_or_else(|| ConfigError::UnknownMode(mode.to_string()))
    }

    /// `true` if any blacklist token is a case-insensitive substring of `path` (§4.1).
    pub fn is_blacklisted(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.blacklist
            .iter()
            .any(|token| lower.contains(&token.to_lowercase()))
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            small_volume_weight: 0.1,
            iops_weight: 0.1,
            latency_weight: 0.1,
            fullness_weight: 0.15,
            cold_file_ratio_weight: 0.2,
            old_file_ratio_weight: 0.15,
            blacklist_file_ratio_weight: 0.1,
            restore_pressure_weight: 0.05,
            size_access_ratio_weight: 0.05,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            small_volume_threshold_gb: 1.0,
            iops_idle_threshold: 10.0,
            latency_idle_threshold_ms: 5.0,
            scan_score_threshold: 0.5,
            min_hours_between_scans: 6,
            min_cold_file_age_days: 90,
            min_old_file_age_days: 180,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "mode": "default",
            "blacklist": ["secret", "tmp"],
            "modes": {
                "default": {
                    "weights": {
                        "small_volume_weight": 0.1, "iops_weight": 0.1, "latency_weight": 0.1,
                        "fullness_weight": 0.3, "cold_file_ratio_weight": 0.3, "old_file_ratio_weight": 0.1,
                        "blacklist_file_ratio_weight": 0.0, "restore_pressure_weight": 0.0,
                        "size_access_ratio_weight": 0.0
                    },
                    "thresholds": {
                        "small_volume_threshold_gb": 1.0, "iops_idle_threshold": 10.0,
                        "latency_idle_threshold_ms": 5.0, "scan_score_threshold": 0.5,
                        "min_hours_between_scans": 6, "min_cold_file_age_days": 90,
                        "min_old_file_age_days": 180
                    }
                }
            }
        }"#
    }

    #[test]
    fn loads_valid_config() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(sample_json().as_bytes()).unwrap();
        let settings = Settings::load(f.path()).unwrap();
        assert_eq!(settings.mode, PolicyMode::Default);
        assert!(settings.is_blacklisted(r"\\host\share\proj\SECRET\report.pdf"));
        assert!(!settings.is_blacklisted(r"\\host\share\proj\report.pdf"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let bad = r#"{"mode": "default", "blacklist": [], "modes": {}, "extra_field": 1}"#;
        let err = serde_json::from_str::<Settings>(bad).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn unknown_mode_falls_back_to_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(sample_json().as_bytes()).unwrap();
        let settings = Settings::load(f.path()).unwrap();
        assert!(settings.mode_config(PolicyMode::Eco).is_err());
    }
}
