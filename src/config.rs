use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "trend-watch.toml";
pub const DEFAULT_RECENT_DAYS: u32 = 10;
pub const DEFAULT_ROLLING_WINDOW: usize = 3;
pub const DEFAULT_DROP_RATIO_THRESHOLD: f64 = 0.3;
pub const DEFAULT_TOP_TERMS: usize = 3;
pub const DEFAULT_TERM_DELIMITER: &str = ",";
pub const MAX_RECENT_DAYS: u32 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub recent_days: u32,
    pub rolling_window: usize,
    pub drop_ratio_threshold: f64,
    pub top_terms: usize,
    pub term_delimiter: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            recent_days: DEFAULT_RECENT_DAYS,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            drop_ratio_threshold: DEFAULT_DROP_RATIO_THRESHOLD,
            top_terms: DEFAULT_TOP_TERMS,
            term_delimiter: DEFAULT_TERM_DELIMITER.to_owned(),
        }
    }
}

/// Per-invocation overrides, typically from CLI flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub recent_days: Option<u32>,
    pub rolling_window: Option<usize>,
    pub drop_ratio_threshold: Option<f64>,
    pub top_terms: Option<usize>,
    pub term_delimiter: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl AnalysisConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Loads an explicit path, else the default file in `dir` if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let fallback = dir.join(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            Self::load_from(&fallback)
        } else {
            Ok(Self::default())
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(value) = overrides.recent_days {
            self.recent_days = value;
        }
        if let Some(value) = overrides.rolling_window {
            self.rolling_window = value;
        }
        if let Some(value) = overrides.drop_ratio_threshold {
            self.drop_ratio_threshold = value;
        }
        if let Some(value) = overrides.top_terms {
            self.top_terms = value;
        }
        if let Some(value) = overrides.term_delimiter {
            self.term_delimiter = value;
        }
        self.validate()
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.recent_days == 0 || self.recent_days > MAX_RECENT_DAYS {
            return Err(ConfigError::Invalid(format!(
                "recent_days must be in 1..={MAX_RECENT_DAYS}, got {}",
                self.recent_days
            )));
        }
        if self.rolling_window == 0 {
            return Err(ConfigError::Invalid("rolling_window must be at least 1".into()));
        }
        if !(self.drop_ratio_threshold > 0.0 && self.drop_ratio_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "drop_ratio_threshold must be in (0, 1], got {}",
                self.drop_ratio_threshold
            )));
        }
        if self.term_delimiter.is_empty() {
            return Err(ConfigError::Invalid("term_delimiter must not be empty".into()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config = AnalysisConfig::from_toml_str("rolling_window = 5\n").unwrap();
        assert_eq!(config.rolling_window, 5);
        assert_eq!(config.recent_days, 10);
        assert_eq!(config.drop_ratio_threshold, 0.3);
        assert_eq!(config.term_delimiter, ",");
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config = AnalysisConfig::from_toml_str("recent_days = 14\ntop_terms = 5\n")
            .unwrap()
            .with_overrides(ConfigOverrides {
                recent_days: Some(7),
                drop_ratio_threshold: Some(0.5),
                ..ConfigOverrides::default()
            })
            .unwrap();
        assert_eq!(config.recent_days, 7);
        assert_eq!(config.top_terms, 5);
        assert_eq!(config.drop_ratio_threshold, 0.5);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let zero_window = AnalysisConfig::default().with_overrides(ConfigOverrides {
            rolling_window: Some(0),
            ..ConfigOverrides::default()
        });
        assert!(matches!(zero_window, Err(ConfigError::Invalid(_))));

        let ratio = AnalysisConfig::default().with_overrides(ConfigOverrides {
            drop_ratio_threshold: Some(1.5),
            ..ConfigOverrides::default()
        });
        assert!(matches!(ratio, Err(ConfigError::Invalid(_))));

        let huge_window = AnalysisConfig::default().with_overrides(ConfigOverrides {
            recent_days: Some(200_000_000),
            ..ConfigOverrides::default()
        });
        assert!(matches!(huge_window, Err(ConfigError::Invalid(_))));
        assert!(matches!(
            AnalysisConfig::from_toml_str("recent_days = 36501\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert_eq!(
            AnalysisConfig::from_toml_str("recent_days = 36500\n").unwrap().recent_days,
            MAX_RECENT_DAYS
        );

        assert!(matches!(
            AnalysisConfig::from_toml_str("recent_days = \"ten\""),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn load_prefers_explicit_then_default_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            AnalysisConfig::load(None, dir.path()).unwrap(),
            AnalysisConfig::default()
        );

        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "recent_days = 20\n").unwrap();
        assert_eq!(AnalysisConfig::load(None, dir.path()).unwrap().recent_days, 20);

        let explicit = dir.path().join("other.toml");
        fs::write(&explicit, "recent_days = 3\n").unwrap();
        assert_eq!(
            AnalysisConfig::load(Some(&explicit), dir.path()).unwrap().recent_days,
            3
        );

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            AnalysisConfig::load(Some(&missing), dir.path()),
            Err(ConfigError::Io { .. })
        ));
    }
}
