//! Summary reduction over an annotated series

use chrono::{DateTime, Utc};
use metrisight_core::{Error, Result};
use serde::Serialize;

use crate::annotated::AnnotatedSeries;
use crate::stats::{mean_and_std, percentage_half_up};

// aggregate view of one detection run, computed fresh each time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub anomaly_count: usize,
    pub total_points: usize,
    pub anomaly_pct: f64, // half-up, 2 decimals
    pub max_z_score: Option<f64>, // only for z-score runs
    pub mean: f64,
    pub std: f64, // sample std
    pub time_range_start: DateTime<Utc>,
    pub time_range_end: DateTime<Utc>,
}

/// Reduce an annotated series to counts and descriptive statistics.
///
/// Fails with `InvalidArgument` on an empty series.
pub fn summarize(annotated: &AnnotatedSeries) -> Result<Summary> {
    let points = &annotated.points;
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(Error::invalid_argument(
            "annotated_series",
            "cannot summarize an empty series",
        ));
    };

    let total_points = points.len();
    let anomaly_count = annotated.anomaly_count();

    let max_z_score = points
        .iter()
        .filter_map(|p| p.detail.z_score())
        .map(f64::abs)
        .fold(None, |max: Option<f64>, z| Some(max.map_or(z, |m| m.max(z))));

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let (mean, std) = mean_and_std(&values);

    let (time_range_start, time_range_end) = points.iter().fold(
        (first.timestamp, last.timestamp),
        |(start, end), p| (start.min(p.timestamp), end.max(p.timestamp)),
    );

    Ok(Summary {
        anomaly_count,
        total_points,
        anomaly_pct: percentage_half_up(anomaly_count, total_points),
        max_z_score,
        mean,
        std,
        time_range_start,
        time_range_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotated::{AnnotatedPoint, PointDetail};
    use crate::config::DetectionMethod;
    use chrono::{Duration, TimeZone};

    fn annotated(flags: &[bool]) -> AnnotatedSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = flags
            .iter()
            .enumerate()
            .map(|(i, &is_anomaly)| AnnotatedPoint {
                timestamp: start + Duration::minutes(i as i64),
                value: (i + 1) as f64,
                is_anomaly,
                upper_bound: 0.0,
                lower_bound: 0.0,
                detail: PointDetail::MovingAverage {
                    rolling_mean: None,
                    rolling_std: None,
                },
            })
            .collect();
        AnnotatedSeries {
            method: DetectionMethod::moving_average(2, 2.0),
            points,
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = summarize(&annotated(&[false, true, false, true, false])).unwrap();

        assert_eq!(summary.total_points, 5);
        assert_eq!(summary.anomaly_count, 2);
        assert_eq!(summary.anomaly_pct, 40.0);
        assert_eq!(summary.mean, 3.0);
        assert_eq!(summary.max_z_score, None);
        assert_eq!(summary.time_range_end - summary.time_range_start, Duration::minutes(4));
    }

    #[test]
    fn test_no_anomalies() {
        let summary = summarize(&annotated(&[false, false, false])).unwrap();
        assert_eq!(summary.anomaly_count, 0);
        assert_eq!(summary.anomaly_pct, 0.0);
    }

    #[test]
    fn test_empty_is_invalid_argument() {
        let err = summarize(&annotated(&[])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_rounding_boundary_is_half_up() {
        let mut flags = vec![false; 20_000];
        flags[..2469].fill(true);

        let summary = summarize(&annotated(&flags)).unwrap();

        // 12.345% exactly
        assert_eq!(summary.anomaly_pct, 12.35);
    }
}
