//! Engine configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the proof engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Candidate matching settings.
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Revocation settings.
    #[serde(default)]
    pub revocation: RevocationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Compare attribute names case- and whitespace-insensitively.
    #[serde(default = "default_true")]
    pub normalize_names: bool,
    /// Upper bound on candidates returned per referent.
    #[serde(default)]
    pub max_candidates_per_referent: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationConfig {
    /// Registry capacity used when the caller does not supply one.
    #[serde(default = "default_max_cred_num")]
    pub default_max_cred_num: u32,
    /// Reject selections of revocable credentials that carry no timestamp.
    #[serde(default = "default_true")]
    pub require_timestamp: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_true() -> bool {
    true
}
fn default_max_cred_num() -> u32 {
    100
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            normalize_names: true,
            max_candidates_per_referent: None,
        }
    }
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            default_max_cred_num: default_max_cred_num(),
            require_timestamp: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: EngineConfig = toml::from_str(&contents)?;
            tracing::debug!(path = %path.display(), "loaded engine config");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
