//! Annotated series: the output contract shared by both detectors

use chrono::{DateTime, Utc};
use metrisight_core::Point;
use serde::Serialize;

use crate::config::DetectionMethod;

/// Method-specific fields of an annotated point.
///
/// Serialized flat next to the common fields, so a Z-Score point carries
/// `z_score` and a Moving-Average point carries `rolling_mean`/`rolling_std`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PointDetail {
    ZScore {
        z_score: f64,
    },
    /// `None` means the trailing window is not yet fully populated.
    MovingAverage {
        rolling_mean: Option<f64>,
        rolling_std: Option<f64>,
    },
}

impl PointDetail {
    pub fn z_score(&self) -> Option<f64> {
        match self {
            Self::ZScore { z_score } => Some(*z_score),
            Self::MovingAverage { .. } => None,
        }
    }

    pub fn is_warming_up(&self) -> bool {
        matches!(
            self,
            Self::MovingAverage {
                rolling_mean: None,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnnotatedPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub is_anomaly: bool,
    pub upper_bound: f64,
    pub lower_bound: f64,
    #[serde(flatten)]
    pub detail: PointDetail,
}

impl AnnotatedPoint {
    // flag from the band, so is_anomaly always agrees with the bounds
    pub(crate) fn banded(point: &Point, lower_bound: f64, upper_bound: f64, detail: PointDetail) -> Self {
        Self {
            timestamp: point.timestamp,
            value: point.value,
            is_anomaly: point.value > upper_bound || point.value < lower_bound,
            upper_bound,
            lower_bound,
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedSeries {
    pub method: DetectionMethod,
    pub points: Vec<AnnotatedPoint>,
}

impl AnnotatedSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points flagged as anomalous, in timestamp order.
    pub fn anomalies(&self) -> impl Iterator<Item = &AnnotatedPoint> {
        self.points.iter().filter(|p| p.is_anomaly)
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies().count()
    }
}
