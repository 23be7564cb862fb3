//! Detection method configuration

use metrisight_core::{Error, Result, Series};
use serde::{Deserialize, Serialize};

use crate::annotated::AnnotatedSeries;
use crate::{detect_moving_avg, detect_zscore};

pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;
pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_MOVING_AVG_THRESHOLD: f64 = 2.0;

// Detection type and parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum DetectionMethod {
    // global mean/std band
    #[serde(rename = "zscore")]
    ZScore {
        #[serde(default = "default_zscore_threshold")]
        threshold: f64,
    },
    // trailing rolling mean/std band
    #[serde(rename = "moving_avg")]
    MovingAverage {
        #[serde(default = "default_window")]
        window: usize,
        #[serde(default = "default_moving_avg_threshold")]
        threshold: f64,
    },
}

impl DetectionMethod {
    pub fn zscore(threshold: f64) -> Self {
        Self::ZScore { threshold }
    }

    pub fn moving_average(window: usize, threshold: f64) -> Self {
        Self::MovingAverage { window, threshold }
    }

    pub fn threshold(&self) -> f64 {
        match self {
            Self::ZScore { threshold } | Self::MovingAverage { threshold, .. } => *threshold,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ZScore { .. } => "Z-Score",
            Self::MovingAverage { .. } => "Moving Average",
        }
    }

    /// Run the configured detector over `series`.
    pub fn detect(&self, series: &Series) -> Result<AnnotatedSeries> {
        match *self {
            Self::ZScore { threshold } => detect_zscore(series, threshold),
            Self::MovingAverage { window, threshold } => {
                detect_moving_avg(series, window, threshold)
            }
        }
    }
}

impl Default for DetectionMethod {
    fn default() -> Self {
        Self::zscore(DEFAULT_ZSCORE_THRESHOLD)
    }
}

/// A threshold must be a finite, strictly positive multiplier.
pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(Error::invalid_argument(
            "threshold",
            format!("must be a finite number greater than 0, got {}", threshold),
        ));
    }
    Ok(())
}

// default value helpers for serde
fn default_zscore_threshold() -> f64 {
    DEFAULT_ZSCORE_THRESHOLD
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

fn default_moving_avg_threshold() -> f64 {
    DEFAULT_MOVING_AVG_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        detection: DetectionMethod,
    }

    #[test]
    fn test_parse_zscore() {
        let toml_content = r#"
[detection]
method = "zscore"
threshold = 2.5
"#;
        let parsed: Wrapper = toml::from_str(toml_content).unwrap();
        assert_eq!(parsed.detection, DetectionMethod::zscore(2.5));
    }

    #[test]
    fn test_parse_moving_avg_defaults() {
        let toml_content = r#"
[detection]
method = "moving_avg"
"#;
        let parsed: Wrapper = toml::from_str(toml_content).unwrap();
        assert_eq!(parsed.detection, DetectionMethod::moving_average(20, 2.0));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let toml_content = r#"
[detection]
method = "isolation_forest"
"#;
        assert!(toml::from_str::<Wrapper>(toml_content).is_err());
    }

    #[test]
    fn test_validate_threshold() {
        assert!(validate_threshold(0.1).is_ok());
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = validate_threshold(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { name: "threshold", .. }));
        }
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&DetectionMethod::moving_average(10, 2.0)).unwrap();
        assert_eq!(json, r#"{"method":"moving_avg","window":10,"threshold":2.0}"#);
    }
}
