//! Configuration loading functionality.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{EngineError, EngineResult};

use super::types::EngineConfig;

/// Loads engine configuration from a YAML file.
///
/// A missing file is not an error: the engine ships with usable defaults
/// and deployments override only what they need.
///
/// # Example
///
/// ```no_run
/// use policy_engine::config::ConfigLoader;
///
/// let config = ConfigLoader::load("./config/engine.yaml").unwrap();
/// println!("cache ttl: {}s", config.cache.ttl_secs);
/// ```
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the given path, falling back to defaults
    /// when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<EngineConfig> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no configuration file, using defaults");
            return Ok(EngineConfig::default());
        }
        Self::load_yaml(path)
    }

    fn load_yaml(path: &Path) -> EngineResult<EngineConfig> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|e| EngineError::ConfigError {
            path: path_str.clone(),
            message: e.to_string(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigError {
            path: path_str,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ConfigLoader::load("/nonexistent/engine.yaml").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.simulation.batch_size, 50);
        assert_eq!(config.retro.max_periods, 12);
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache:\n  ttlSecs: 60\nsimulation:\n  batchSize: 10").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.simulation.batch_size, 10);
        // untouched sections keep their defaults
        assert_eq!(config.simulation.budget_ms, 30_000);
        assert_eq!(config.retro.max_periods, 12);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache: [not, a, map]").unwrap();

        assert!(matches!(
            ConfigLoader::load(file.path()),
            Err(EngineError::ConfigError { .. })
        ));
    }
}
