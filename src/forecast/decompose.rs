//! Classical seasonal decomposition and autocorrelation-based period
//! detection.

use serde::{Deserialize, Serialize};

use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonalityType {
    Additive,
    Multiplicative,
}

#[derive(Debug, Clone)]
pub struct Decomposition {
    pub seasonality: SeasonalityType,
    pub period: usize,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

/// Centered moving average of `period` width. For even periods this is a
/// "2 x m" centered average (average of two overlapping m-windows); for
/// odd periods a single centered m-window. Positions too close to either
/// edge to have a full window are `f64::NAN`.
fn centered_moving_average(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut out = vec![f64::NAN; n];
    if period % 2 == 1 {
        let half = period / 2;
        for i in half..n.saturating_sub(half) {
            let window = &data[i - half..=i + half];
            out[i] = stats::mean(window);
        }
    } else {
        let half = period / 2;
        for i in half..n.saturating_sub(half) {
            let first = &data[i - half..i - half + period];
            let second_start = i - half + 1;
            let second = &data[second_start..second_start + period];
            out[i] = (stats::mean(first) + stats::mean(second)) / 2.0;
        }
    }
    out
}

fn linear_regression_trend(data: &[f64]) -> Vec<f64> {
    let xs: Vec<f64> = (0..data.len()).map(|i| i as f64).collect();
    let (slope, intercept) = stats::linear_regression(&xs, data);
    xs.iter().map(|x| slope * x + intercept).collect()
}

/// Decompose `data` into trend, seasonal, and residual components using
/// classical decomposition. Falls back to a linear-regression trend when
/// fewer than `2 * period` points are available (too short for a
/// centered moving-average trend to be reliable).
pub fn decompose(data: &[f64], period: usize, seasonality: SeasonalityType) -> Decomposition {
    let n = data.len();
    let trend = if n >= period * 2 {
        let cma = centered_moving_average(data, period);
        // Fill NaN edges by extending the nearest valid trend value so
        // downstream seasonal/residual math has a value everywhere.
        fill_edges(&cma)
    } else {
        linear_regression_trend(data)
    };

    let detrended: Vec<f64> = match seasonality {
        SeasonalityType::Additive => data.iter().zip(trend.iter()).map(|(v, t)| v - t).collect(),
        SeasonalityType::Multiplicative => data
            .iter()
            .zip(trend.iter())
            .map(|(v, t)| if t.abs() > f64::EPSILON { v / t } else { 1.0 })
            .collect(),
    };

    let mut seasonal_by_position = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, &v) in detrended.iter().enumerate() {
        seasonal_by_position[i % period] += v;
        counts[i % period] += 1;
    }
    for i in 0..period {
        if counts[i] > 0 {
            seasonal_by_position[i] /= counts[i] as f64;
        }
    }

    match seasonality {
        SeasonalityType::Additive => {
            let mean = stats::mean(&seasonal_by_position);
            for s in &mut seasonal_by_position {
                *s -= mean;
            }
        }
        SeasonalityType::Multiplicative => {
            let mean = stats::mean(&seasonal_by_position);
            if mean.abs() > f64::EPSILON {
                for s in &mut seasonal_by_position {
                    *s /= mean;
                }
            }
        }
    }

    let seasonal: Vec<f64> = (0..n).map(|i| seasonal_by_position[i % period]).collect();

    let residual: Vec<f64> = match seasonality {
        SeasonalityType::Additive => data
            .iter()
            .zip(trend.iter())
            .zip(seasonal.iter())
            .map(|((v, t), s)| v - t - s)
            .collect(),
        SeasonalityType::Multiplicative => data
            .iter()
            .zip(trend.iter())
            .zip(seasonal.iter())
            .map(|((v, t), s)| {
                let denom = t * s;
                if denom.abs() > f64::EPSILON {
                    v / denom
                } else {
                    1.0
                }
            })
            .collect(),
    };

    Decomposition {
        seasonality,
        period,
        trend,
        seasonal,
        residual,
    }
}

fn fill_edges(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    if let Some(first_valid) = out.iter().position(|v| !v.is_nan()) {
        for v in &mut out[..first_valid] {
            *v = out[first_valid];
        }
    }
    if let Some(last_valid) = out.iter().rposition(|v| !v.is_nan()) {
        let fill = out[last_valid];
        for v in &mut out[last_valid + 1..] {
            *v = fill;
        }
    }
    out
}

fn autocorrelation(data: &[f64], lag: usize) -> f64 {
    let n = data.len();
    if lag >= n {
        return 0.0;
    }
    let mean = stats::mean(data);
    let denom: f64 = data.iter().map(|v| (v - mean).powi(2)).sum();
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    let numer: f64 = (0..n - lag).map(|i| (data[i] - mean) * (data[i + lag] - mean)).sum();
    numer / denom
}

/// Detect the dominant seasonal period by scanning autocorrelation over
/// lags `2..=max_lag` and returning the first local maximum whose ACF
/// exceeds 0.3. Returns `None` if no such lag exists.
pub fn detect_seasonal_period(data: &[f64], max_lag: usize) -> Option<usize> {
    let max_lag = max_lag.min(data.len().saturating_sub(1));
    if max_lag < 2 {
        return None;
    }
    let acf: Vec<f64> = (0..=max_lag).map(|lag| autocorrelation(data, lag)).collect();
    for lag in 2..max_lag {
        if acf[lag] > 0.3 && acf[lag] >= acf[lag - 1] && acf[lag] >= acf[lag + 1] {
            return Some(lag);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seasonal_series(period: usize, seasons: usize) -> Vec<f64> {
        let pattern: Vec<f64> = (0..period).map(|i| 5.0 + (i as f64).sin()).collect();
        let mut out = Vec::with_capacity(period * seasons);
        for s in 0..seasons {
            for &p in &pattern {
                out.push(p + s as f64 * 0.1);
            }
        }
        out
    }

    #[test]
    fn decompose_reconstructs_series_additively() {
        let data = seasonal_series(7, 8);
        let d = decompose(&data, 7, SeasonalityType::Additive);
        for i in 0..data.len() {
            let reconstructed = d.trend[i] + d.seasonal[i] + d.residual[i];
            assert!((reconstructed - data[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn decompose_short_series_uses_linear_trend_fallback() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let d = decompose(&data, 4, SeasonalityType::Additive);
        assert_eq!(d.trend.len(), data.len());
        assert!(d.trend.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn detects_known_period() {
        let data = seasonal_series(7, 10);
        let detected = detect_seasonal_period(&data, 20);
        assert_eq!(detected, Some(7));
    }

    #[test]
    fn flat_series_has_no_detectable_period() {
        let data = vec![10.0; 40];
        assert_eq!(detect_seasonal_period(&data, 20), None);
    }
}
