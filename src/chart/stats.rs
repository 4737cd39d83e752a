//! Descriptive statistics used by chart derivation: box-plot summaries and
//! ordinary least squares fits.

use serde::Serialize;

use crate::metrics::mean;

/// Whisker reach, in multiples of the interquartile range.
const WHISKER_IQR: f64 = 1.5;

/// Five-number summary of one box, plus the points drawn individually.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub count: usize,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub mean: f64,
    /// Values beyond the whiskers, ascending.
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Summarize `values`; `None` when there is nothing to summarize.
    ///
    /// Quartiles use linear interpolation between closest ranks. Whiskers end
    /// at the most extreme values still within 1.5 × IQR of the box.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile_sorted(&sorted, 0.25);
        let median = quantile_sorted(&sorted, 0.5);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let low_fence = q1 - WHISKER_IQR * iqr;
        let high_fence = q3 + WHISKER_IQR * iqr;

        let mut lower_whisker = f64::INFINITY;
        let mut upper_whisker = f64::NEG_INFINITY;
        let mut outliers = Vec::new();
        for &v in &sorted {
            if v < low_fence || v > high_fence {
                outliers.push(v);
            } else {
                lower_whisker = lower_whisker.min(v);
                upper_whisker = upper_whisker.max(v);
            }
        }

        Some(BoxStats {
            count: sorted.len(),
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
            mean: mean(sorted.iter().copied()),
            outliers,
        })
    }
}

/// Quantile `q` (0..=1) of an ascending, non-empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Ordinary least squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n: usize,
    pub x_min: f64,
    pub x_max: f64,
}

impl LinearFit {
    /// Fit the points; `None` with fewer than two distinct x values.
    pub fn fit(points: &[[f64; 2]]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let x_mean = points.iter().map(|p| p[0]).sum::<f64>() / n;
        let y_mean = points.iter().map(|p| p[1]).sum::<f64>() / n;

        let mut sxx = 0.0_f64;
        let mut sxy = 0.0_f64;
        let mut syy = 0.0_f64;
        for [x, y] in points {
            sxx += (x - x_mean).powi(2);
            sxy += (x - x_mean) * (y - y_mean);
            syy += (y - y_mean).powi(2);
        }
        if sxx.abs() < f64::EPSILON {
            return None;
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;
        let ss_res: f64 = points
            .iter()
            .map(|[x, y]| (y - (slope * x + intercept)).powi(2))
            .sum();
        let r_squared = if syy.abs() < f64::EPSILON {
            1.0
        } else {
            1.0 - ss_res / syy
        };

        Some(LinearFit {
            slope,
            intercept,
            r_squared,
            n: points.len(),
            x_min: points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min),
            x_max: points.iter().map(|p| p[0]).fold(f64::NEG_INFINITY, f64::max),
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// End points of the fitted segment over the observed x range.
    pub fn segment(&self) -> [[f64; 2]; 2] {
        [
            [self.x_min, self.predict(self.x_min)],
            [self.x_max, self.predict(self.x_max)],
        ]
    }
}
