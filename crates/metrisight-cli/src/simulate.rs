// Simulated metrics with injected anomalies, for demos and offline runs

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use metrisight_core::{Error, Point, Result, Series};
use rand::prelude::*;
use std::f64::consts::PI;

// upper bound on generated points, about 11 days at one second
const MAX_POINTS: usize = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MetricKind {
    /// Daily sine cycle around 50%
    Cpu,
    /// Slow climb with garbage-collection drops
    Memory,
    /// Low baseline with traffic bursts, in ms
    Latency,
}

impl MetricKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Latency => "latency",
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        match self {
            Self::Cpu | Self::Memory => value.clamp(0.0, 100.0),
            Self::Latency => value.max(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub metric: MetricKind,
    pub hours: f64,
    pub interval_seconds: u64,
    pub anomaly_ratio: f64,
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn new(metric: MetricKind) -> Self {
        Self {
            metric,
            hours: 24.0,
            interval_seconds: 60,
            anomaly_ratio: 0.03,
            seed: None,
        }
    }

    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours = hours;
        self
    }

    pub fn with_interval(mut self, interval_seconds: u64) -> Self {
        self.interval_seconds = interval_seconds;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    fn point_count(&self) -> Result<usize> {
        if self.interval_seconds == 0 {
            return Err(Error::invalid_argument("interval", "must be greater than 0"));
        }
        if !self.hours.is_finite() || self.hours <= 0.0 {
            return Err(Error::invalid_argument(
                "hours",
                format!("must be a positive number, got {}", self.hours),
            ));
        }
        if !(0.0..=1.0).contains(&self.anomaly_ratio) {
            return Err(Error::invalid_argument(
                "anomaly_ratio",
                format!("must be within 0..=1, got {}", self.anomaly_ratio),
            ));
        }
        let n = (self.hours * 3600.0 / self.interval_seconds as f64) as usize;
        if n == 0 {
            return Err(Error::invalid_argument(
                "hours",
                "range is shorter than one interval",
            ));
        }
        if n > MAX_POINTS {
            return Err(Error::invalid_argument(
                "hours",
                format!("{} points exceeds the limit of {}", n, MAX_POINTS),
            ));
        }
        Ok(n)
    }
}

/// A generated series plus which points were deliberately disturbed.
#[derive(Debug, Clone)]
pub struct Simulated {
    pub series: Series,
    pub injected: Vec<bool>,
    pub seed: u64,
}

impl Simulated {
    pub fn injected_count(&self) -> usize {
        self.injected.iter().filter(|&&i| i).count()
    }
}

#[derive(Clone, Copy)]
enum Disturbance {
    Spike,
    Dip,
    Shift,
}

/// Generate a series ending at `end`. The same seed gives the same values.
pub fn generate(config: &SimulationConfig, end: DateTime<Utc>) -> Result<Simulated> {
    let n = config.point_count()?;
    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut values = match config.metric {
        MetricKind::Cpu => cpu(n, &mut rng),
        MetricKind::Memory => memory(n, &mut rng),
        MetricKind::Latency => latency(n, &mut rng),
    };

    let injected = inject(&mut values, config.anomaly_ratio, &mut rng);

    let step = seconds("interval", config.interval_seconds as f64)?;
    let start = seconds("hours", config.hours * 3600.0)
        .ok()
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| Error::invalid_argument("hours", "range reaches before the earliest time"))?;
    let points = values
        .iter()
        .enumerate()
        .map(|(i, v)| Point::new(start + step * i as i32, config.metric.clamp(*v)))
        .collect();

    Ok(Simulated {
        series: Series::from_points(points)?,
        injected,
        seed,
    })
}

fn seconds(name: &'static str, secs: f64) -> Result<Duration> {
    Duration::try_seconds(secs as i64)
        .ok_or_else(|| Error::invalid_argument(name, format!("{} seconds is out of range", secs)))
}

fn cpu(n: usize, rng: &mut StdRng) -> Vec<f64> {
    (0..n)
        .map(|t| 50.0 + 15.0 * cycle(t, n) + normal(rng, 3.0))
        .collect()
}

fn memory(n: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut gc = vec![0.0; n];
    for start in distinct_indices(n, (n / 200).max(1), rng) {
        let len = rng.random_range(3..10).min(n - start);
        let drop = rng.random_range(5.0..15.0);
        for slot in &mut gc[start..start + len] {
            *slot = -drop;
        }
    }
    (0..n)
        .map(|t| 50.0 + 20.0 * (t as f64 / n as f64) + gc[t] + normal(rng, 2.0))
        .collect()
}

fn latency(n: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut bursts = vec![0.0; n];
    for i in distinct_indices(n, (n / 50).max(1), rng) {
        bursts[i] = rng.random_range(10.0..30.0);
    }
    (0..n)
        .map(|t| 30.0 + 5.0 * cycle(t, n) + bursts[t] + normal(rng, 3.0))
        .collect()
}

// disturb a fraction of points, returns the mask of touched points
fn inject(values: &mut [f64], ratio: f64, rng: &mut StdRng) -> Vec<bool> {
    let n = values.len();
    let mut injected = vec![false; n];
    let spread = population_std(values);
    let count = ((n as f64 * ratio) as usize).max(1);

    for idx in distinct_indices(n, count, rng) {
        let kind = match rng.random_range(0..3) {
            0 => Disturbance::Spike,
            1 => Disturbance::Dip,
            _ => Disturbance::Shift,
        };
        match kind {
            Disturbance::Spike => values[idx] += rng.random_range(3.0..6.0) * spread,
            Disturbance::Dip => values[idx] -= rng.random_range(3.0..5.0) * spread,
            Disturbance::Shift => {
                let len = rng.random_range(5..15).min(n - idx);
                let offset = rng.random_range(2.0..4.0) * spread;
                for i in idx..idx + len {
                    values[i] += offset;
                    injected[i] = true;
                }
            }
        }
        injected[idx] = true;
    }
    injected
}

fn cycle(t: usize, n: usize) -> f64 {
    (2.0 * PI * t as f64 / n as f64).sin()
}

// Box-Muller
fn normal(rng: &mut StdRng, std: f64) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>(); // (0, 1]
    let u2: f64 = rng.random();
    std * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

// partial Fisher-Yates
fn distinct_indices(n: usize, k: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..n).collect();
    let k = k.min(n);
    for i in 0..k {
        let j = rng.random_range(i..n);
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_point_count_and_spacing() {
        let config = SimulationConfig::new(MetricKind::Cpu)
            .with_hours(2.0)
            .with_interval(60)
            .with_seed(Some(7));
        let sim = generate(&config, end()).unwrap();

        assert_eq!(sim.series.len(), 120);
        assert_eq!(sim.injected.len(), 120);
        assert_eq!(sim.series.first().timestamp, end() - Duration::hours(2));
        let pts = sim.series.points();
        assert_eq!(pts[1].timestamp - pts[0].timestamp, Duration::seconds(60));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let config = SimulationConfig::new(MetricKind::Latency).with_seed(Some(42));
        let a = generate(&config, end()).unwrap();
        let b = generate(&config, end()).unwrap();
        assert_eq!(a.series, b.series);
        assert_eq!(a.injected, b.injected);
        assert_eq!(a.seed, 42);
    }

    #[test]
    fn test_values_are_clamped() {
        for metric in [MetricKind::Cpu, MetricKind::Memory] {
            let config = SimulationConfig::new(metric).with_seed(Some(3));
            let sim = generate(&config, end()).unwrap();
            assert!(sim.series.values().iter().all(|v| (0.0..=100.0).contains(v)));
        }
        let config = SimulationConfig::new(MetricKind::Latency).with_seed(Some(3));
        let sim = generate(&config, end()).unwrap();
        assert!(sim.series.values().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_anomalies_are_injected() {
        let config = SimulationConfig::new(MetricKind::Memory).with_seed(Some(11));
        let sim = generate(&config, end()).unwrap();
        // 3% of 1440 points, shifts can extend the mask
        assert!(sim.injected_count() >= 43);
    }

    #[test]
    fn test_invalid_config() {
        let zero = SimulationConfig::new(MetricKind::Cpu).with_interval(0);
        assert!(generate(&zero, end()).is_err());

        let tiny = SimulationConfig::new(MetricKind::Cpu)
            .with_hours(0.001)
            .with_interval(3600);
        assert!(generate(&tiny, end()).is_err());
    }

    #[test]
    fn test_oversized_ranges_are_rejected() {
        let too_many = SimulationConfig::new(MetricKind::Cpu).with_hours(1.0e9);
        assert!(generate(&too_many, end()).is_err());

        // few points, but the range itself is beyond what a timestamp holds
        let too_long = SimulationConfig::new(MetricKind::Cpu)
            .with_hours(1.0e13)
            .with_interval(1_000_000_000_000);
        assert!(too_long.point_count().is_ok());
        assert!(generate(&too_long, end()).is_err());
    }

    #[test]
    fn test_distinct_indices() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut picked = distinct_indices(50, 10, &mut rng);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 10);
        assert!(picked.iter().all(|&i| i < 50));
    }
}
