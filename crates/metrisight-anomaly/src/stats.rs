//! Descriptive statistics used by the detectors and the summary

/// Mean and sample spread of a slice, safe for any finite input.
///
/// Computed directly when the sums stay finite. Otherwise the values are
/// divided by their largest magnitude first, and z-scores and bands are
/// evaluated in that scaled space so they never come out NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    scale: f64,
    mean: f64, // in scaled units
    std: f64,  // in scaled units
}

impl Moments {
    /// A constant slice gets a std of exactly `0.0`, so a flat window can
    /// never produce a band narrower than floating-point noise. Slices
    /// shorter than two elements have a std of `0.0`; an empty slice is
    /// all zeros.
    pub fn of(values: &[f64]) -> Self {
        let Some(&first) = values.first() else {
            return Self::unscaled(0.0, 0.0);
        };
        if values.iter().all(|&v| v == first) {
            return Self::unscaled(first, 0.0);
        }

        let (mean, std) = sample_moments(values.iter().copied());
        if mean.is_finite() && std.is_finite() {
            return Self::unscaled(mean, std);
        }

        // non-constant, so at least one value is non-zero
        let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let (mean, std) = sample_moments(values.iter().map(|v| v / scale));
        Self { scale, mean, std }
    }

    fn unscaled(mean: f64, std: f64) -> Self {
        Self {
            scale: 1.0,
            mean,
            std,
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean * self.scale
    }

    /// Sample std (ddof = 1). Can be infinite when the spread itself is
    /// beyond `f64::MAX`.
    pub fn std(&self) -> f64 {
        self.std * self.scale
    }

    pub fn is_flat(&self) -> bool {
        self.std == 0.0
    }

    /// Distance from the mean in standard deviations, `0.0` for a flat slice.
    pub fn z_score(&self, value: f64) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        (value / self.scale - self.mean) / self.std
    }

    /// `(mean - threshold·std, mean + threshold·std)`; lower never exceeds
    /// upper and neither is NaN.
    pub fn band(&self, threshold: f64) -> (f64, f64) {
        let spread = threshold * self.std;
        (
            (self.mean - spread) * self.scale,
            (self.mean + spread) * self.scale,
        )
    }
}

// two-pass mean and sample std
fn sample_moments(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let (n, sum) = values.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    let mean = sum / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let squares = values.map(|v| (v - mean).powi(2)).sum::<f64>();
    (mean, (squares / (n - 1) as f64).sqrt())
}

/// Mean and sample standard deviation (ddof = 1), see [`Moments`].
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let moments = Moments::of(values);
    (moments.mean(), moments.std())
}

/// `count / total * 100` rounded half-up to two decimals.
///
/// Computed on integers so ties are exact: 2469 of 20000 is 12.345% and
/// rounds to 12.35. `total` must be non-zero.
pub fn percentage_half_up(count: usize, total: usize) -> f64 {
    let count = count as u128;
    let total = total as u128;
    let hundredths = (count * 20_000 + total) / (2 * total);
    hundredths as f64 / 100.0
}
