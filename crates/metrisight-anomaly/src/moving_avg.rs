//! Moving-average detection against a trailing rolling band

use metrisight_core::{Error, Result, Series};
use tracing::debug;

use crate::annotated::{AnnotatedPoint, AnnotatedSeries, PointDetail};
use crate::config::{DetectionMethod, validate_threshold};
use crate::stats::Moments;

/// Flag points outside `rolling_mean ± threshold·rolling_std`, where the
/// rolling statistics cover the trailing `window` points ending at (and
/// including) the current one. No look-ahead.
///
/// The first `window - 1` points are the warm-up: their rolling fields are
/// `None`, both bounds equal the point's own value, and they are never
/// flagged.
pub fn detect_moving_avg(series: &Series, window: usize, threshold: f64) -> Result<AnnotatedSeries> {
    if window < 2 {
        return Err(Error::invalid_argument(
            "window",
            format!("must be at least 2, got {}", window),
        ));
    }
    validate_threshold(threshold)?;
    if window > series.len() {
        return Err(Error::invalid_argument(
            "window",
            format!(
                "window of {} exceeds series length {}, statistics would never warm up",
                window,
                series.len()
            ),
        ));
    }

    let values = series.values();
    let warmup = window - 1;
    let mut points = Vec::with_capacity(series.len());

    // warm-up: band collapses to the point itself
    for point in &series.points()[..warmup] {
        points.push(AnnotatedPoint::banded(
            point,
            point.value,
            point.value,
            PointDetail::MovingAverage {
                rolling_mean: None,
                rolling_std: None,
            },
        ));
    }

    // window k ends at point warmup + k
    for (point, slice) in series.points()[warmup..].iter().zip(values.windows(window)) {
        let moments = Moments::of(slice);
        let (lower, upper) = moments.band(threshold);
        points.push(AnnotatedPoint::banded(
            point,
            lower,
            upper,
            PointDetail::MovingAverage {
                rolling_mean: Some(moments.mean()),
                rolling_std: Some(moments.std()),
            },
        ));
    }

    let annotated = AnnotatedSeries {
        method: DetectionMethod::moving_average(window, threshold),
        points,
    };

    debug!(
        points = annotated.len(),
        anomalies = annotated.anomaly_count(),
        window,
        threshold,
        "moving-average detection complete"
    );

    Ok(annotated)
}
