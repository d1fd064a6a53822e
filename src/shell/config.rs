//! Tunables for the shell supervisor.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Max bytes taken from a pipe per read.
    pub read_chunk_size: usize,
    /// Decoded chunks buffered between the pump and the output callback.
    pub channel_capacity: usize,
    /// Value exported as `TERM` so the shell avoids cursor and color escapes.
    pub term: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 4 * 1024,
            channel_capacity: 256,
            term: "dumb".to_string(),
        }
    }
}

impl SupervisorConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Invalid supervisor configuration")?;
        Ok(config.normalized())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Clamps sizes that tokio would reject (a zero-capacity channel panics).
    pub fn normalized(mut self) -> Self {
        self.read_chunk_size = self.read_chunk_size.max(1);
        self.channel_capacity = self.channel_capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.read_chunk_size, 4096);
        assert_eq!(config.channel_capacity, 256);
        assert_eq!(config.term, "dumb");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SupervisorConfig::from_json(r#"{ "term": "vt100" }"#).unwrap();
        assert_eq!(config.term, "vt100");
        assert_eq!(config.read_chunk_size, 4096);
    }

    #[test]
    fn test_zero_sizes_are_clamped() {
        let config =
            SupervisorConfig::from_json(r#"{ "read_chunk_size": 0, "channel_capacity": 0 }"#)
                .unwrap();
        assert_eq!(config.read_chunk_size, 1);
        assert_eq!(config.channel_capacity, 1);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = SupervisorConfig::from_json("{ not json").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid supervisor configuration"));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = SupervisorConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
