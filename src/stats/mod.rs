//! Pure statistical functions over `&[f64]`. No state, no I/O; every
//! function here is safe to call from any thread and is used as the
//! foundation for the anomaly detectors, the forecaster, and the
//! recommendation engine's percentile sizing.

/// Arithmetic mean. Returns 0.0 for an empty slice (callers are expected
/// to check `len()` first where zero is not a sensible default).
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n-1 denominator). Returns 0.0 for fewer than 2 values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Sample standard deviation (n-1 denominator).
pub fn stddev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut copy: Vec<f64> = values.to_vec();
    copy.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    copy
}

/// Percentile (0..=100) over `values` with linear interpolation between
/// the two closest ranks, computed against a sorted copy.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted_copy(values);
    percentile_sorted(&sorted, p)
}

/// Same as [`percentile`] but takes an already-sorted slice, to avoid
/// re-sorting when computing several percentiles over the same data.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let p = p.clamp(0.0, 100.0);
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Quartiles with the small-sample fallback: n<4 uses q1=first, q3=last,
/// median=midpoint (average of the two middle elements, or the single
/// element for odd small n), matching the spec's explicit edge case.
pub fn quartiles(values: &[f64]) -> Quartiles {
    let sorted = sorted_copy(values);
    if sorted.is_empty() {
        return Quartiles {
            q1: 0.0,
            median: 0.0,
            q3: 0.0,
        };
    }
    if sorted.len() < 4 {
        let median = if sorted.len() == 1 {
            sorted[0]
        } else {
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        };
        return Quartiles {
            q1: sorted[0],
            median,
            q3: sorted[sorted.len() - 1],
        };
    }
    Quartiles {
        q1: percentile_sorted(&sorted, 25.0),
        median: percentile_sorted(&sorted, 50.0),
        q3: percentile_sorted(&sorted, 75.0),
    }
}

/// Median absolute deviation: median(|x - median(x)|). A robust
/// dispersion estimator used by the modified-z-score outlier screen.
pub fn mad(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let med = quartiles(values).median;
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    quartiles(&deviations).median
}

/// Simple linear regression `y = slope*x + intercept` over paired
/// (x, y) series of equal length, using ordinary least squares.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return (0.0, if n == 1 { ys[0] } else { 0.0 });
    }
    let xs = &xs[..n];
    let ys = &ys[..n];
    let mean_x = mean(xs);
    let mean_y = mean(ys);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        cov += dx * (ys[i] - mean_y);
        var_x += dx * dx;
    }
    if var_x.abs() < f64::EPSILON {
        return (0.0, mean_y);
    }
    let slope = cov / var_x;
    let intercept = mean_y - slope * mean_x;
    (slope, intercept)
}

/// Centered moving average with boundary-shrinking: the window shrinks
/// near the edges rather than padding, so every input index gets an
/// output value.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() || window == 0 {
        return values.to_vec();
    }
    let half = window / 2;
    let n = values.len();
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            mean(&values[start..end])
        })
        .collect()
}

/// Median smoothing with the same centered, boundary-shrinking window.
pub fn median_smoothing(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() || window == 0 {
        return values.to_vec();
    }
    let half = window / 2;
    let n = values.len();
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            quartiles(&values[start..end]).median
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_stddev_known_values() {
        let v = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < 1e-9);
        // population variance is 4.0; sample (n-1) stddev is slightly higher
        assert!(stddev(&v) > 2.0 && stddev(&v) < 2.2);
    }

    #[test]
    fn percentile_linear_interpolation() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&v, 50.0) - 2.5).abs() < 1e-9);
        assert!((percentile(&v, 0.0) - 1.0).abs() < 1e-9);
        assert!((percentile(&v, 100.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn quartiles_small_sample_fallback() {
        let v = vec![10.0, 20.0, 30.0];
        let q = quartiles(&v);
        assert_eq!(q.q1, 10.0);
        assert_eq!(q.q3, 30.0);
        assert_eq!(q.median, 20.0);
    }

    #[test]
    fn quartiles_normal_sample() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let q = quartiles(&v);
        assert!(q.q1 < q.median && q.median < q.q3);
    }

    #[test]
    fn mad_robust_to_outlier() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 100.0];
        let m = mad(&v);
        assert!(m < 5.0, "MAD should stay small despite the outlier, got {m}");
    }

    #[test]
    fn linear_regression_perfect_line() {
        let xs = vec![0.0, 1.0, 2.0, 3.0];
        let ys = vec![1.0, 3.0, 5.0, 7.0];
        let (slope, intercept) = linear_regression(&xs, &ys);
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn moving_average_preserves_length() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ma = moving_average(&v, 3);
        assert_eq!(ma.len(), v.len());
    }
}
