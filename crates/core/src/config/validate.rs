use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Encoder path is not empty
/// - Explicit worker count is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.encoder.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "encoder.path cannot be empty".to_string(),
        ));
    }

    if config.pool.max_workers == Some(0) {
        return Err(ConfigError::ValidationError(
            "pool.max_workers cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncoderConfig, PoolConfig};
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_encoder_path_fails() {
        let config = Config {
            encoder: EncoderConfig {
                path: PathBuf::new(),
                ..Default::default()
            },
            pool: PoolConfig::default(),
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let config = Config {
            encoder: EncoderConfig::default(),
            pool: PoolConfig {
                max_workers: Some(0),
            },
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
