//! # Hub Configuration
//!
//! Optional TOML file. Every key has a default, so a missing file or a
//! missing section is fine.
//!
//! ```toml
//! [server]
//! max_body_bytes = 2097152
//!
//! [ingest]
//! stamp_timestamp = true
//! assign_id = false
//! required_fields = ["level", "message"]
//! max_batch = 1000
//! ```

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Upper bound on request bodies.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct IngestConfig {
    /// Add a `timestamp` field (RFC 3339, UTC) to records that lack one.
    #[serde(default = "default_stamp_timestamp")]
    pub stamp_timestamp: bool,
    /// Add an `id` field (UUID v4) to records that lack one.
    #[serde(default)]
    pub assign_id: bool,
    /// Fields every ingested record must carry.
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Most records accepted in one request.
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            stamp_timestamp: default_stamp_timestamp(),
            assign_id: false,
            required_fields: Vec::new(),
            max_batch: default_max_batch(),
        }
    }
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}
fn default_stamp_timestamp() -> bool {
    true
}
fn default_max_batch() -> usize {
    1000
}

impl Config {
    /// Load the config file at `path`. A missing file yields the defaults;
    /// an unreadable or invalid one is logged and also yields the defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No config file at {:?}, using defaults", path);
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}; using defaults", path, e);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Invalid config {:?}: {}; using defaults", path, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ingest]
            required_fields = ["level"]
            "#,
        )
        .unwrap();
        assert_eq!(config.ingest.required_fields, vec!["level"]);
        assert!(config.ingest.stamp_timestamp);
        assert_eq!(config.ingest.max_batch, 1000);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_missing_and_invalid_files_fall_back() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(Config::load(&dir.path().join("absent.toml")), Config::default());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[ingest\nmax_batch = ").unwrap();
        assert_eq!(Config::load(&bad), Config::default());

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[server]\nmax_body_bytes = 1024\n").unwrap();
        assert_eq!(Config::load(&good).server.max_body_bytes, 1024);
    }
}
