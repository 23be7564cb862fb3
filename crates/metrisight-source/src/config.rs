// Source section of the TOML config

use std::time::Duration;

use serde::Deserialize;

use crate::auth::Auth;
use crate::error::SourceError;
use crate::query::{QuerySpec, DEFAULT_STEP_SECONDS};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub query: String,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: f64,
    #[serde(default = "default_step_seconds")]
    pub step_seconds: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_lookback_hours() -> f64 {
    24.0
}

fn default_step_seconds() -> u64 {
    DEFAULT_STEP_SECONDS
}

fn default_timeout_seconds() -> u64 {
    30
}

impl SourceConfig {
    pub fn new(url: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: query.into(),
            lookback_hours: default_lookback_hours(),
            step_seconds: default_step_seconds(),
            timeout_seconds: default_timeout_seconds(),
            auth: Auth::None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Build a query covering the last `lookback_hours`, ending now.
    pub fn to_query_spec(&self) -> Result<QuerySpec, SourceError> {
        if !self.lookback_hours.is_finite() || self.lookback_hours <= 0.0 {
            return Err(SourceError::InvalidArgument {
                name: "lookback_hours",
                reason: format!("must be a positive number, got {}", self.lookback_hours),
            });
        }
        // float to int casts saturate, try_seconds rejects what chrono cannot hold
        let lookback = chrono::Duration::try_seconds((self.lookback_hours * 3600.0).round() as i64)
            .ok_or_else(|| SourceError::InvalidArgument {
                name: "lookback_hours",
                reason: format!("{} is out of range", self.lookback_hours),
            })?;
        let spec = QuerySpec::lookback(self.url.clone(), self.query.clone(), lookback)?
            .with_step(self.step_seconds)
            .with_auth(self.auth.clone())
            .with_timeout(self.timeout());
        spec.validate()?;
        Ok(spec)
    }
}
