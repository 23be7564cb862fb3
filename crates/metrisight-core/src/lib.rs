//! Core types for MetriSight
//! the series model shared by the detectors, the remote source client and the CLI.

pub mod error;
pub mod series;
pub mod timestamp;

pub use error::{Error, Result};
pub use series::{Point, RawRow, Series};
pub use timestamp::{from_unix_seconds, parse_timestamp};
