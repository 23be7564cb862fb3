//! MetriSight Anomaly Detection
//!
//! Two statistical detectors over a [`Series`](metrisight_core::Series) and the
//! summary reduction shared by both. Every function here is pure: same input,
//! same output, no shared state.

pub mod annotated;
pub mod config;
pub mod moving_avg;
pub mod stats;
pub mod summary;
pub mod zscore;

pub use annotated::{AnnotatedPoint, AnnotatedSeries, PointDetail};
pub use config::DetectionMethod;
pub use moving_avg::detect_moving_avg;
pub use summary::{Summary, summarize};
pub use zscore::detect_zscore;
