//! Z-Score detection against a single global band

use metrisight_core::{Result, Series};
use tracing::debug;

use crate::annotated::{AnnotatedPoint, AnnotatedSeries, PointDetail};
use crate::config::{DetectionMethod, validate_threshold};
use crate::stats::Moments;

/// Flag points more than `threshold` sample standard deviations from the
/// global mean.
///
/// The band `mean ± threshold·std` is the same for every point. A constant
/// series (std = 0) gets `z_score = 0` everywhere, both bounds equal to the
/// mean, and no anomalies.
pub fn detect_zscore(series: &Series, threshold: f64) -> Result<AnnotatedSeries> {
    validate_threshold(threshold)?;

    let moments = Moments::of(&series.values());
    let (lower_bound, upper_bound) = moments.band(threshold);

    let points: Vec<AnnotatedPoint> = series
        .iter()
        .map(|point| {
            let z_score = moments.z_score(point.value);
            AnnotatedPoint::banded(point, lower_bound, upper_bound, PointDetail::ZScore { z_score })
        })
        .collect();

    let annotated = AnnotatedSeries {
        method: DetectionMethod::zscore(threshold),
        points,
    };

    debug!(
        points = annotated.len(),
        anomalies = annotated.anomaly_count(),
        mean = moments.mean(),
        std = moments.std(),
        threshold,
        "z-score detection complete"
    );

    Ok(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use metrisight_core::{Error, Point};

    fn series(values: &[f64]) -> Series {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Point::new(start + Duration::minutes(i as i64), v))
            .collect();
        Series::from_points(points).unwrap()
    }

    #[test]
    fn test_z_scores_use_sample_std() {
        let result = detect_zscore(&series(&[10.0, 20.0, 30.0, 40.0, 50.0]), 2.0).unwrap();

        // mean 30, sample std sqrt(250)
        let std = 250.0_f64.sqrt();
        let z = result.points[4].detail.z_score().unwrap();
        assert!((z - 20.0 / std).abs() < 1e-12);
        assert!((result.points[0].upper_bound - (30.0 + 2.0 * std)).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_are_symmetric_and_global() {
        let result = detect_zscore(&series(&[10.0, 20.0, 30.0, 40.0, 50.0]), 2.0).unwrap();

        for p in &result.points {
            assert_eq!(p.upper_bound, result.points[0].upper_bound);
            assert_eq!(p.lower_bound, result.points[0].lower_bound);
            assert!(((p.upper_bound - 30.0) - (30.0 - p.lower_bound)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_series_has_collapsed_band() {
        let result = detect_zscore(&series(&[50.0; 10]), 3.0).unwrap();

        for p in &result.points {
            assert!(!p.is_anomaly);
            assert_eq!(p.detail.z_score(), Some(0.0));
            assert_eq!(p.upper_bound, 50.0);
            assert_eq!(p.lower_bound, 50.0);
        }
    }

    #[test]
    fn test_single_point() {
        let result = detect_zscore(&series(&[7.0]), 3.0).unwrap();
        assert_eq!(result.len(), 1);
        assert!(!result.points[0].is_anomaly);
    }

    #[test]
    fn test_extreme_values_keep_ordered_bounds() {
        let result = detect_zscore(&series(&[f64::MAX, f64::MAX * 0.5, f64::MAX]), 2.0).unwrap();

        for p in &result.points {
            assert!(p.lower_bound <= p.upper_bound);
            assert!(p.detail.z_score().is_some_and(f64::is_finite));
        }
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["points"][1]["z_score"].is_number());
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let s = series(&[1.0, 2.0, 3.0]);
        for bad in [0.0, -2.0, f64::NAN] {
            let err = detect_zscore(&s, bad).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { name: "threshold", .. }));
        }
    }
}
