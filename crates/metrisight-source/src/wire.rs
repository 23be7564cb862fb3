// Prometheus HTTP API wire format

use std::collections::BTreeMap;

use metrisight_core::{from_unix_seconds, Point};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{NetworkErrorKind, SourceError};

// server messages are cut to this many characters
const MAX_MESSAGE_CHARS: usize = 200;

// values the API uses for non-finite samples
const NON_FINITE_SENTINELS: [&str; 4] = ["NaN", "+Inf", "-Inf", "Inf"];

// envelope shared by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: String,
    data: Option<T>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatrixData {
    #[serde(default, rename = "resultType")]
    pub result_type: Option<String>,
    #[serde(default)]
    pub result: Vec<MatrixSeries>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatrixSeries {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<(f64, String)>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BuildInfo {
    #[serde(default)]
    pub version: Option<String>,
}

/// Map an HTTP status plus body onto the error taxonomy, or decode `data`.
pub(crate) fn classify_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, SourceError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SourceError::Auth {
            status: status.as_u16(),
        });
    }
    if status.is_server_error() {
        return Err(SourceError::Network {
            kind: NetworkErrorKind::Server {
                status: status.as_u16(),
            },
            message: server_message(body),
        });
    }
    if !status.is_success() {
        return Err(SourceError::Query {
            status: Some(status.as_u16()),
            message: format!("HTTP {}: {}", status.as_u16(), server_message(body)),
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| {
        SourceError::InvalidData(format!(
            "undecodable response ({}): {}",
            e,
            truncate(body)
        ))
    })?;

    if envelope.status == "error" {
        return Err(SourceError::Query {
            status: Some(status.as_u16()),
            message: envelope_error(envelope.error_type, envelope.error),
        });
    }

    envelope
        .data
        .ok_or_else(|| SourceError::InvalidData("response has no data field".to_string()))
}

/// Convert one result series into points.
///
/// Non-finite sentinels are dropped; any other unparseable sample fails.
/// Returns the points and how many samples were dropped.
pub(crate) fn series_points(series: &MatrixSeries) -> Result<(Vec<Point>, usize), SourceError> {
    let mut points = Vec::with_capacity(series.values.len());
    let mut dropped = 0;

    for (ts, raw) in &series.values {
        if NON_FINITE_SENTINELS.contains(&raw.as_str()) {
            dropped += 1;
            continue;
        }
        let timestamp = from_unix_seconds(*ts)
            .ok_or_else(|| SourceError::InvalidData(format!("invalid sample timestamp {}", ts)))?;
        let value: f64 = raw
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| {
                SourceError::InvalidData(format!("invalid sample value '{}' at {}", raw, ts))
            })?;
        points.push(Point::new(timestamp, value));
    }

    Ok((points, dropped))
}

// prefer the API's own error message over the raw body
fn server_message(body: &str) -> String {
    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) if envelope.error.is_some() => {
            envelope_error(envelope.error_type, envelope.error)
        }
        _ => truncate(body),
    }
}

fn envelope_error(error_type: Option<String>, error: Option<String>) -> String {
    let error = truncate(error.as_deref().unwrap_or("unknown error"));
    match error_type {
        Some(kind) if !kind.is_empty() => format!("{}: {}", kind, error),
        _ => error,
    }
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[
            {"metric":{"__name__":"up"},"values":[[1700000000,"42.5"],[1700000060.5,"43.1"]]}
        ]}}"#;

        let data: MatrixData = classify_response(StatusCode::OK, body).unwrap();
        assert_eq!(data.result_type.as_deref(), Some("matrix"));
        assert_eq!(data.result[0].metric["__name__"], "up");

        let (points, dropped) = series_points(&data.result[0]).unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(points[0].value, 42.5);
        assert_eq!(points[1].timestamp.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_error_envelope_on_200() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error at char 4"}"#;
        let err = classify_response::<MatrixData>(StatusCode::OK, body).unwrap_err();
        assert_eq!(
            err,
            SourceError::Query {
                status: Some(200),
                message: "bad_data: parse error at char 4".to_string()
            }
        );
    }

    #[test]
    fn test_status_classification() {
        let err = classify_response::<MatrixData>(StatusCode::FORBIDDEN, "denied").unwrap_err();
        assert_eq!(err, SourceError::Auth { status: 403 });

        let err = classify_response::<MatrixData>(StatusCode::SERVICE_UNAVAILABLE, "busy").unwrap_err();
        assert!(err.is_retryable());

        let body = r#"{"status":"error","errorType":"bad_data","error":"invalid parameter \"step\""}"#;
        let err = classify_response::<MatrixData>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, SourceError::Query { status: Some(400), .. }));
        assert!(err.to_string().contains("invalid parameter"));
    }

    #[test]
    fn test_undecodable_body() {
        let err = classify_response::<MatrixData>(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, SourceError::InvalidData(_)));
    }

    #[test]
    fn test_sentinels_are_dropped() {
        let series = MatrixSeries {
            metric: BTreeMap::new(),
            values: vec![
                (1.0, "1.5".to_string()),
                (2.0, "NaN".to_string()),
                (3.0, "+Inf".to_string()),
                (4.0, "2.5".to_string()),
            ],
        };
        let (points, dropped) = series_points(&series).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(points.iter().map(|p| p.value).collect::<Vec<_>>(), vec![1.5, 2.5]);
    }

    #[test]
    fn test_garbage_value_is_invalid_data() {
        let series = MatrixSeries {
            metric: BTreeMap::new(),
            values: vec![(1.0, "fast".to_string())],
        };
        assert!(matches!(series_points(&series), Err(SourceError::InvalidData(_))));
    }

    #[test]
    fn test_long_messages_are_truncated() {
        let body = "x".repeat(1_000);
        let err = classify_response::<MatrixData>(StatusCode::NOT_FOUND, &body).unwrap_err();
        assert!(err.to_string().len() < 250);
        assert!(err.to_string().ends_with("..."));
    }
}
