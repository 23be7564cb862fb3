// Range query specification and pagination

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::auth::Auth;
use crate::error::SourceError;

pub const DEFAULT_STEP_SECONDS: u64 = 60;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One range query against a metrics source.
///
/// `timeout` is a deadline for the whole call: every page and every retry
/// must finish inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub base_url: String,
    pub query: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step_seconds: u64,
    pub auth: Auth,
    pub timeout: Duration,
}

impl QuerySpec {
    pub fn new(
        base_url: impl Into<String>,
        query: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            query: query.into(),
            start,
            end,
            step_seconds: DEFAULT_STEP_SECONDS,
            auth: Auth::None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Range ending now and starting `lookback` earlier.
    pub fn lookback(
        base_url: impl Into<String>,
        query: impl Into<String>,
        lookback: chrono::Duration,
    ) -> Result<Self, SourceError> {
        let end = Utc::now();
        let start = end
            .checked_sub_signed(lookback)
            .ok_or_else(|| invalid("lookback", format!("{} is out of range", lookback)))?;
        Ok(Self::new(base_url, query, start, end))
    }

    pub fn with_step(mut self, step_seconds: u64) -> Self {
        self.step_seconds = step_seconds;
        self
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), SourceError> {
        if self.base_url.trim().is_empty() {
            return Err(invalid("base_url", "must not be empty"));
        }
        if self.query.trim().is_empty() {
            return Err(invalid("query", "must not be empty"));
        }
        if self.step_seconds == 0 {
            return Err(invalid("step_seconds", "must be greater than 0"));
        }
        self.step()?;
        if self.start > self.end {
            return Err(invalid(
                "start",
                format!("{} is after end {}", self.start, self.end),
            ));
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout", "must be greater than 0"));
        }
        Ok(())
    }

    fn step(&self) -> Result<chrono::Duration, SourceError> {
        i64::try_from(self.step_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| invalid("step_seconds", format!("{} is out of range", self.step_seconds)))
    }

    /// Split the range into consecutive pages of at most `max_points` samples.
    ///
    /// Page boundaries stay on the `start + k·step` grid and never overlap.
    pub(crate) fn pages(
        &self,
        max_points: usize,
    ) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, SourceError> {
        let step = self.step()?;
        let per_page = i32::try_from(max_points.max(1) - 1).unwrap_or(i32::MAX);
        // None when the page span itself overflows, which reaches past `end`
        let span = step.checked_mul(per_page);

        let mut pages = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            let page_end = span
                .and_then(|span| cursor.checked_add_signed(span))
                .map_or(self.end, |t| t.min(self.end));
            pages.push((cursor, page_end));
            match page_end.checked_add_signed(step) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        Ok(pages)
    }

    pub(crate) fn step_param(&self) -> String {
        format!("{}s", self.step_seconds)
    }
}

pub(crate) fn format_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn invalid(name: &'static str, reason: impl Into<String>) -> SourceError {
    SourceError::InvalidArgument {
        name,
        reason: reason.into(),
    }
}
