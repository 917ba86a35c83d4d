//! Project configuration for mockingjay

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint expectation set (YAML)
    #[serde(default = "default_endpoints")]
    pub endpoints: PathBuf,

    /// Behavior table for the monkey layer (YAML, optional)
    #[serde(default)]
    pub monkey: Option<PathBuf>,

    /// Port the fake server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the real service to check compatibility against
    #[serde(default)]
    pub real_url: Option<String>,

    /// Per-request timeout for compatibility checks, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Max in-flight compatibility checks (unbounded when absent)
    #[serde(default)]
    pub concurrency: Option<usize>,
}

fn default_endpoints() -> PathBuf {
    PathBuf::from("mockingjay.yaml")
}

const fn default_port() -> u16 {
    9090
}

const fn default_timeout_ms() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            monkey: None,
            port: default_port(),
            real_url: None,
            timeout_ms: default_timeout_ms(),
            concurrency: None,
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.mockingjay.toml)
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".mockingjay.toml", ".mockingjay.json", "mockingjay.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# mockingjay configuration

# Endpoint expectation set: served by `mockingjay serve`,
# replayed against real_url by `mockingjay check`
endpoints = "mockingjay.yaml"

# Behavior table for the monkey layer (optional)
# monkey = "monkey.yaml"

# Fake server port
port = 9090

# Real service to check compatibility against
# real_url = "http://localhost:8080"

# Per-request timeout for compatibility checks (milliseconds)
timeout_ms = 5000

# Max in-flight checks (unbounded by default)
# concurrency = 16
"#
    }
}

/// Load-time errors. Nothing gets constructed from a config that raises one.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Endpoint #{index} ('{name}'): {reason}")]
    InvalidEndpoint {
        index: usize,
        name: String,
        reason: String,
    },
    #[error("Endpoint name '{0}' is used more than once")]
    DuplicateEndpoint(String),
    #[error("Behavior #{index}: {source}")]
    InvalidBehavior {
        index: usize,
        #[source]
        source: crate::behavior::BehaviorError,
    },
    #[error("Behavior frequencies sum to {total}, which exceeds 1")]
    FrequencyOverflow { total: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.endpoints, PathBuf::from("mockingjay.yaml"));
        assert_eq!(config.port, 9090);
        assert_eq!(config.timeout_ms, 5000);
        assert!(config.monkey.is_none());
        assert!(config.real_url.is_none());
    }

    #[test]
    fn parse_toml() {
        let toml = r#"
endpoints = "contracts.yaml"
monkey = "monkey.yaml"
port = 1234
real_url = "http://localhost:3000"
concurrency = 8
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.endpoints, PathBuf::from("contracts.yaml"));
        assert_eq!(config.monkey, Some(PathBuf::from("monkey.yaml")));
        assert_eq!(config.port, 1234);
        assert_eq!(config.real_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.concurrency, Some(8));
        assert_eq!(config.timeout_ms, 5000);
    }

    #[test]
    fn example_config_parses() {
        let config: Config = toml::from_str(Config::example()).unwrap();
        assert_eq!(config.endpoints, PathBuf::from("mockingjay.yaml"));
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mockingjay.json");
        std::fs::write(&path, r#"{"endpoints": "api.yaml", "timeout_ms": 250}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.endpoints, PathBuf::from("api.yaml"));
        assert_eq!(config.timeout_ms, 250);
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
