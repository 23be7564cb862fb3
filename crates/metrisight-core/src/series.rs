//! Series model: an ordered, validated timestamp/value sequence

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::timestamp::parse_timestamp;

/// One observation of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Point {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

// Raw row as it comes off a tabular source (CSV upload, simulator export)
// both columns are kept as text until validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRow {
    pub timestamp: String,
    pub value: String,
}

impl RawRow {
    pub fn new(timestamp: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            value: value.into(),
        }
    }
}

/// A non-empty series sorted ascending by timestamp, with unique timestamps
/// and finite values. The invariants hold for every constructed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    points: Vec<Point>,
}

impl Series {
    /// Build a series from raw text rows.
    ///
    /// Fails on the first row whose timestamp or value cannot be parsed;
    /// nothing is dropped or coerced.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut points = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            // row numbers are 1-based to match what a user sees in a spreadsheet
            let line = i + 1;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| {
                Error::invalid_data(format!(
                    "row {}: unparseable timestamp '{}'",
                    line, row.timestamp
                ))
            })?;
            let value = parse_value(&row.value)
                .map_err(|reason| Error::invalid_data(format!("row {}: {}", line, reason)))?;
            points.push(Point { timestamp, value });
        }
        Self::from_points(points)
    }

    /// Build a series from typed points. Points are stable-sorted by timestamp.
    pub fn from_points(mut points: Vec<Point>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::invalid_data("series is empty"));
        }
        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(Error::invalid_data(format!(
                "non-finite value {} at {}",
                bad.value, bad.timestamp
            )));
        }

        points.sort_by_key(|p| p.timestamp);

        if let Some(pair) = points.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(Error::invalid_data(format!(
                "duplicate timestamp {}",
                pair[0].timestamp
            )));
        }

        Ok(Self { points })
    }

    /// Read a headered CSV with `timestamp` and `value` columns.
    /// Other columns are ignored.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers().map_err(csv_error)?.clone();
        for column in ["timestamp", "value"] {
            if !headers.iter().any(|h| h == column) {
                return Err(Error::invalid_data(format!(
                    "missing required column '{}' (found: {})",
                    column,
                    headers.iter().collect::<Vec<_>>().join(", ")
                )));
            }
        }

        let rows = rdr
            .deserialize::<RawRow>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(csv_error)?;

        Self::from_rows(rows)
    }

    /// Write the series as a `timestamp,value` CSV with RFC 3339 timestamps.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for point in &self.points {
            wtr.serialize(point).map_err(csv_error)?;
        }
        wtr.flush()
            .map_err(|e| Error::invalid_data(format!("failed to flush CSV: {}", e)))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    // always false, construction rejects empty input
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first(&self) -> &Point {
        &self.points[0]
    }

    pub fn last(&self) -> &Point {
        &self.points[self.points.len() - 1]
    }

    /// First and last timestamps.
    pub fn time_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.first().timestamp, self.last().timestamp)
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

// parse a value column, rejecting anything that is not a finite float
fn parse_value(raw: &str) -> std::result::Result<f64, String> {
    let trimmed = raw.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| format!("non-numeric value '{}'", raw))?;
    if !value.is_finite() {
        return Err(format!("non-finite value '{}'", raw));
    }
    Ok(value)
}

fn csv_error(e: csv::Error) -> Error {
    Error::invalid_data(format!("CSV error: {}", e))
}
