use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub pool: PoolConfig,
}

/// External encoder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderConfig {
    /// Path to the `flac` binary. Resolved once at startup.
    #[serde(default = "default_encoder_path")]
    pub path: PathBuf,
    /// Run `<encoder> --version` before the first batch.
    #[serde(default = "default_validate_on_startup")]
    pub validate_on_startup: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            path: default_encoder_path(),
            validate_on_startup: default_validate_on_startup(),
        }
    }
}

fn default_encoder_path() -> PathBuf {
    PathBuf::from("flac")
}

fn default_validate_on_startup() -> bool {
    true
}

/// Worker pool configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Number of concurrent encoder processes. `None` uses every available core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

impl PoolConfig {
    /// Resolved worker count, never below one.
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.encoder.path, PathBuf::from("flac"));
        assert!(config.encoder.validate_on_startup);
        assert!(config.pool.max_workers.is_none());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[encoder]
path = "/opt/flac/bin/flac"
validate_on_startup = false

[pool]
max_workers = 3
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.encoder.path, PathBuf::from("/opt/flac/bin/flac"));
        assert!(!config.encoder.validate_on_startup);
        assert_eq!(config.pool.max_workers, Some(3));
        assert_eq!(config.pool.worker_count(), 3);
    }

    #[test]
    fn test_worker_count_defaults_to_cpu_count() {
        let pool = PoolConfig::default();
        assert_eq!(pool.worker_count(), num_cpus::get().max(1));
    }

    #[test]
    fn test_worker_count_never_zero() {
        let pool = PoolConfig {
            max_workers: Some(0),
        };
        assert_eq!(pool.worker_count(), 1);
    }
}
