//! TOML configuration for the CLI

use std::fs;
use std::path::Path;

use metrisight_anomaly::DetectionMethod;
use metrisight_source::SourceConfig;
use serde::Deserialize;

// Main config structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetrisightConfig {
    // seconds between refreshes in watch mode
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,

    // live metrics source, optional for CSV/simulated runs
    #[serde(default)]
    pub source: Option<SourceConfig>,

    #[serde(default)]
    pub detection: DetectionMethod,
}

impl Default for MetrisightConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: default_refresh_interval(),
            source: None,
            detection: DetectionMethod::default(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    60
}

// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(
    path: P,
) -> Result<MetrisightConfig, Box<dyn std::error::Error>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    let config: MetrisightConfig = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrisight_source::Auth;

    #[test]
    fn test_load_config() {
        let toml_content = r#"
refresh_interval_seconds = 30

[source]
url = "http://localhost:9090"
query = "avg(rate(node_cpu_seconds_total{mode!=\"idle\"}[5m])) * 100"
lookback_hours = 6
step_seconds = 60

[source.auth]
type = "bearer"
token = "abc123"

[detection]
method = "moving_avg"
window = 30
threshold = 2.5
"#;
        let config: MetrisightConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.refresh_interval_seconds, 30);

        let source = config.source.unwrap();
        assert_eq!(source.lookback_hours, 6.0);
        assert_eq!(source.auth, Auth::bearer("abc123"));
        assert_eq!(config.detection, DetectionMethod::moving_average(30, 2.5));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: MetrisightConfig = toml::from_str("").unwrap();
        assert_eq!(config, MetrisightConfig::default());
        assert!(config.source.is_none());
        assert_eq!(config.detection, DetectionMethod::zscore(3.0));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/metrisight.toml").unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
