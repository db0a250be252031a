use std::io;
use std::path::Path;

use thiserror::Error;

const BYTES_PER_MB: usize = 1024 * 1024;

/// Runtime configuration snapshot, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub port: u16,
    pub threads: usize,
    pub cache_size_mb: usize,
    pub element_size_mb: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            threads: 8,
            cache_size_mb: 200,
            element_size_mb: 10,
        }
    }
}

impl ProxyConfig {
    /// Reads `name = value` lines from `path`, falling back to defaults for
    /// keys that are absent. A missing file yields the default snapshot.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(error) => return Err(ConfigError::Io(error)),
        };

        let mut config = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "port" => config.port = parse_value("port", value)?,
                "threads" => config.threads = parse_value("threads", value)?,
                "cache_size_mb" => config.cache_size_mb = parse_value("cache_size_mb", value)?,
                "element_size_mb" => {
                    config.element_size_mb = parse_value("element_size_mb", value)?;
                }
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ZeroValue("port"));
        }
        if self.threads == 0 {
            return Err(ConfigError::ZeroValue("threads"));
        }
        if self.cache_size_mb == 0 {
            return Err(ConfigError::ZeroValue("cache_size_mb"));
        }
        if self.element_size_mb == 0 {
            return Err(ConfigError::ZeroValue("element_size_mb"));
        }
        if self.element_size_mb > self.cache_size_mb {
            return Err(ConfigError::ElementExceedsCacheBudget);
        }
        Ok(())
    }

    pub fn cache_capacity_bytes(&self) -> usize {
        self.cache_size_mb * BYTES_PER_MB
    }

    pub fn max_element_bytes(&self) -> usize {
        self.element_size_mb * BYTES_PER_MB
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),
    #[error("{key} has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("element_size_mb must be <= cache_size_mb")]
    ElementExceedsCacheBudget,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{ConfigError, ProxyConfig};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = ProxyConfig::load("/nonexistent/larder/proxy.conf").expect("defaults");
        assert_eq!(config, ProxyConfig::default());
    }

    #[test]
    fn loads_overrides_and_keeps_defaults_for_absent_keys() {
        let file = write_config("port = 9090\ncache_size_mb = 50\n");
        let config = ProxyConfig::load(file.path()).expect("must load");
        assert_eq!(config.port, 9090);
        assert_eq!(config.cache_size_mb, 50);
        assert_eq!(config.threads, 8);
        assert_eq!(config.element_size_mb, 10);
    }

    #[test]
    fn ignores_unknown_keys_and_malformed_lines() {
        let file = write_config("nonsense\nmax_widgets = 3\nthreads = 2\n");
        let config = ProxyConfig::load(file.path()).expect("must load");
        assert_eq!(config.threads, 2);
    }

    #[test]
    fn rejects_non_numeric_value() {
        let file = write_config("port = eighty\n");
        let error = ProxyConfig::load(file.path()).expect_err("must fail");
        assert!(matches!(error, ConfigError::InvalidValue { key: "port", .. }));
    }

    #[test]
    fn rejects_zero_threads() {
        let file = write_config("threads = 0\n");
        let error = ProxyConfig::load(file.path()).expect_err("must fail");
        assert!(matches!(error, ConfigError::ZeroValue("threads")));
    }

    #[test]
    fn rejects_element_budget_above_cache_budget() {
        let file = write_config("cache_size_mb = 5\nelement_size_mb = 6\n");
        let error = ProxyConfig::load(file.path()).expect_err("must fail");
        assert!(matches!(error, ConfigError::ElementExceedsCacheBudget));
    }

    #[test]
    fn byte_conversions_scale_by_mebibyte() {
        let config = ProxyConfig::default();
        assert_eq!(config.cache_capacity_bytes(), 200 * 1024 * 1024);
        assert_eq!(config.max_element_bytes(), 10 * 1024 * 1024);
    }
}
