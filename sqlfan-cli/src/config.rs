//! CLI configuration, loaded from ~/.sqlfan/config.toml
//!
//! Precedence: CLI flags > config file > built-in defaults. The config
//! path itself can be overridden with SQLFAN_CONFIG.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlfanConfig {
    /// Default database file used when --db is not given
    pub database: Option<PathBuf>,
    /// Default log filter when RUST_LOG is unset
    pub log_level: Option<String>,
}

impl SqlfanConfig {
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SQLFAN_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".sqlfan").join("config.toml"))
    }

    /// Load the config file, falling back to defaults when it is missing
    /// or malformed (a broken config should not take the tool down).
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "ignoring malformed config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg: SqlfanConfig = toml::from_str(
            r#"
            database = "/tmp/example.db"
            log_level = "sqlfan=debug"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.database, Some(PathBuf::from("/tmp/example.db")));
        assert_eq!(cfg.log_level.as_deref(), Some("sqlfan=debug"));
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg: SqlfanConfig = toml::from_str("").unwrap();
        assert!(cfg.database.is_none());
        assert!(cfg.log_level.is_none());
    }
}
