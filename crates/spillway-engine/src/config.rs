//! TOML configuration.
//!
//! Every field has a default; a missing file yields [`SpillwayConfig::default`].

use serde::{Deserialize, Serialize};
use spillway_kernel::{CapacityLimits, DEFAULT_BAND_WIDTH, Position};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_LEDGER_PATH: &str = ".spillway/overflow.jsonl";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("{path}: invalid TOML: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub band_width: Position,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            band_width: DEFAULT_BAND_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LEDGER_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpillwayConfig {
    pub capacity: CapacityLimits,
    pub placement: PlacementConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

impl SpillwayConfig {
    /// Load and validate `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };
        let config: Self = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity.category_limit == 0 {
            return Err(ConfigError::Invalid(
                "capacity.category_limit must be at least 1".to_string(),
            ));
        }
        if self.capacity.guild_headroom >= self.capacity.guild_limit {
            return Err(ConfigError::Invalid(format!(
                "capacity.guild_headroom ({}) must be below capacity.guild_limit ({})",
                self.capacity.guild_headroom, self.capacity.guild_limit
            )));
        }
        if self.placement.band_width == 0 {
            return Err(ConfigError::Invalid(
                "placement.band_width must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_defaults() {
        let config = SpillwayConfig::from_toml_str("").expect("parse");
        assert_eq!(config, SpillwayConfig::default());
        assert_eq!(config.capacity.category_limit, 50);
        assert_eq!(config.capacity.guild_ceiling(), 497);
        assert_eq!(config.placement.band_width, 1000);
        assert_eq!(config.ledger.path, PathBuf::from(".spillway/overflow.jsonl"));
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = SpillwayConfig::from_toml_str(
            r#"
[capacity]
category_limit = 5

[logging]
filter = "spillway_engine=debug"
"#,
        )
        .expect("parse");
        assert_eq!(config.capacity.category_limit, 5);
        assert_eq!(config.capacity.guild_limit, 500);
        assert_eq!(config.placement.band_width, 1000);
        assert_eq!(config.logging.filter, "spillway_engine=debug");
    }

    #[test]
    fn zero_band_width_is_rejected() {
        let err = SpillwayConfig::from_toml_str("[placement]\nband_width = 0\n")
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn headroom_must_stay_below_limit() {
        let err = SpillwayConfig::from_toml_str(
            "[capacity]\nguild_limit = 3\nguild_headroom = 3\n",
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("guild_headroom"));
    }

    #[test]
    fn missing_file_is_defaults() {
        let path = std::env::temp_dir().join(format!(
            "spillway-config-missing-{}.toml",
            std::process::id()
        ));
        let config = SpillwayConfig::load(&path).expect("load");
        assert_eq!(config, SpillwayConfig::default());
    }
}
