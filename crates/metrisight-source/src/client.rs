// Prometheus-compatible HTTP client

use std::collections::BTreeMap;
use std::time::Duration;

use metrisight_core::{Point, Series};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::auth::Auth;
use crate::error::{ErrorKind, SourceError};
use crate::query::{format_time, QuerySpec};
use crate::retry::RetryPolicy;
use crate::wire::{classify_response, series_points, BuildInfo, MatrixData, MatrixSeries};

const QUERY_RANGE_PATH: &str = "/api/v1/query_range";
const BUILD_INFO_PATH: &str = "/api/v1/status/buildinfo";

/// Outcome of a connection probe. Always produced, never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub ok: bool,
    pub version: Option<String>,
    pub error: Option<ErrorKind>,
    pub message: String,
}

/// Range-query client. Holds one connection pool and may be reused across
/// calls; credentials and deadlines come with each call.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    client: Client,
    retry: RetryPolicy,
    max_points_per_request: usize,
}

impl Default for PrometheusClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusClient {
    /// Prometheus rejects range queries above 11,000 points per series.
    pub const DEFAULT_MAX_POINTS: usize = 11_000;

    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            max_points_per_request: Self::DEFAULT_MAX_POINTS,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_points_per_request(mut self, max_points: usize) -> Self {
        self.max_points_per_request = max_points.max(1);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run a range query and normalize the result into a [`Series`].
    pub async fn query_range(&self, spec: &QuerySpec) -> Result<Series, SourceError> {
        spec.validate()?;
        let deadline = deadline_after(spec.timeout);
        let url = endpoint(&spec.base_url, QUERY_RANGE_PATH)?;
        let pages = spec.pages(self.max_points_per_request)?;

        info!(
            query = %spec.query,
            start = %spec.start,
            end = %spec.end,
            step_seconds = spec.step_seconds,
            pages = pages.len(),
            auth = spec.auth.scheme(),
            "Querying metrics source"
        );

        let mut labels: Option<BTreeMap<String, String>> = None;
        let mut points: Vec<Point> = Vec::new();
        let mut dropped = 0;

        for (page, (start, end)) in pages.iter().enumerate() {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("query", &spec.query)
                .append_pair("start", &format_time(*start))
                .append_pair("end", &format_time(*end))
                .append_pair("step", &spec.step_param());

            let data: MatrixData = self
                .send_with_retry(deadline, || {
                    spec.auth.apply(self.client.get(page_url.clone()))
                })
                .await?;

            debug!(
                page,
                series = data.result.len(),
                result_type = data.result_type.as_deref().unwrap_or("unknown"),
                "Received page"
            );

            let Some(series) = select_series(&data.result, &mut labels) else {
                continue;
            };
            let (page_points, page_dropped) = series_points(series)?;
            points.extend(page_points);
            dropped += page_dropped;
        }

        if dropped > 0 {
            debug!(dropped, "Dropped non-finite samples");
        }

        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);

        if points.is_empty() {
            return Err(SourceError::EmptyResult {
                query: spec.query.clone(),
            });
        }

        let series = Series::from_points(points)?;
        info!(points = series.len(), "Range query complete");
        Ok(series)
    }

    /// Probe the source's build-info endpoint once.
    pub async fn test_connection(
        &self,
        base_url: &str,
        auth: &Auth,
        timeout_after: Duration,
    ) -> ConnectionStatus {
        match self.probe(base_url, auth, timeout_after).await {
            Ok(version) => {
                info!(version = %version, "Connected to metrics source");
                ConnectionStatus {
                    ok: true,
                    message: format!("Connected to Prometheus v{}", version),
                    version: Some(version),
                    error: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "Connection check failed");
                let message = match &err {
                    SourceError::Network { .. } => {
                        format!("Cannot connect to {}: {}", base_url, err)
                    }
                    other => other.to_string(),
                };
                ConnectionStatus {
                    ok: false,
                    version: None,
                    error: Some(err.kind()),
                    message,
                }
            }
        }
    }

    async fn probe(
        &self,
        base_url: &str,
        auth: &Auth,
        timeout_after: Duration,
    ) -> Result<String, SourceError> {
        if base_url.trim().is_empty() {
            return Err(SourceError::InvalidArgument {
                name: "base_url",
                reason: "must not be empty".to_string(),
            });
        }
        let url = endpoint(base_url, BUILD_INFO_PATH)?;
        let deadline = deadline_after(timeout_after);
        let info: BuildInfo = self
            .attempt(auth.apply(self.client.get(url)), deadline)
            .await?;
        Ok(info.version.unwrap_or_else(|| "unknown".to_string()))
    }

    async fn send_with_retry<T, F>(&self, deadline: Instant, build: F) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.attempt(build(), deadline).await {
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    match Instant::now().checked_add(delay) {
                        Some(resume) if resume < deadline => {}
                        _ => {
                            debug!(delay_ms, error = %err, "Backoff would pass the deadline");
                            return Err(err);
                        }
                    }
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms,
                        error = %err,
                        "Retrying metrics request"
                    );
                    sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    // one request/response round trip, bounded by the deadline
    async fn attempt<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        deadline: Instant,
    ) -> Result<T, SourceError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(SourceError::timeout("deadline exceeded before request"));
        }

        let round_trip = async {
            let response = request.send().await.map_err(SourceError::from_transport)?;
            let status = response.status();
            let body = response.text().await.map_err(SourceError::from_transport)?;
            Ok::<_, SourceError>((status, body))
        };

        let (status, body) = timeout(remaining, round_trip).await.map_err(|_| {
            SourceError::timeout(format!("no response within {}ms", remaining.as_millis()))
        })??;

        debug!(status = status.as_u16(), bytes = body.len(), "Metrics response");
        classify_response(status, &body)
    }
}

/// Run a range query with a default client.
pub async fn query_range(spec: &QuerySpec) -> Result<Series, SourceError> {
    PrometheusClient::new().query_range(spec).await
}

/// Probe a metrics source with a default client.
pub async fn test_connection(base_url: &str, auth: &Auth, timeout: Duration) -> ConnectionStatus {
    PrometheusClient::new()
        .test_connection(base_url, auth, timeout)
        .await
}

// timeouts too large to add to the clock mean "no practical deadline"
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

fn endpoint(base_url: &str, path: &str) -> Result<Url, SourceError> {
    let joined = format!("{}{}", base_url.trim().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| SourceError::InvalidArgument {
        name: "base_url",
        reason: format!("{}", e),
    })
}

// the first non-empty page fixes the label set for the rest of the query
fn select_series<'a>(
    result: &'a [MatrixSeries],
    labels: &mut Option<BTreeMap<String, String>>,
) -> Option<&'a MatrixSeries> {
    let first = result.first()?;
    if result.len() > 1 {
        debug!(series = result.len(), "Multiple series returned, keeping one");
    }
    match labels {
        Some(wanted) => Some(
            result
                .iter()
                .find(|series| series.metric == *wanted)
                .unwrap_or(first),
        ),
        None => {
            *labels = Some(first.metric.clone());
            Some(first)
        }
    }
}
