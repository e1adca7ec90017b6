use serde::Serialize;

// ── Descriptive helpers ───────────────────────────────────────────────────────

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Pearson correlation coefficient of two equally long samples.
///
/// Returns `None` when fewer than two observations are given, the lengths
/// differ, or either sample has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Trailing rolling mean over `window` values.
///
/// Positions before the window is full are `None`, matching the usual
/// "min periods = window" convention.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < window {
                None
            } else {
                mean(&values[i + 1 - window..=i])
            }
        })
        .collect()
}

// ── LinearTrend ───────────────────────────────────────────────────────────────

/// Least-squares line `y = slope * x + intercept` over `x = 0, 1, 2, …`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearTrend {
    /// Fit a degree-1 polynomial to `values` indexed by position.
    ///
    /// Needs at least two points.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let n = values.len();
        if n < 2 {
            return None;
        }
        let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let mean_x = mean(&xs)?;
        let mean_y = mean(values)?;

        let mut num = 0.0;
        let mut den = 0.0;
        for (x, y) in xs.iter().zip(values) {
            num += (x - mean_x) * (y - mean_y);
            den += (x - mean_x) * (x - mean_x);
        }
        let slope = num / den;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    /// Value of the fitted line at position `x`.
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}
