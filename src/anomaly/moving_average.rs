//! Moving-average residual detector: SMA or EMA baseline, flag where the
//! standardized residual exceeds a threshold.

use crate::stats;

use super::{Anomaly, Severity, MIN_SAMPLES};

#[derive(Debug, Clone, Copy)]
pub struct MovingAverageConfig {
    pub window: usize,
    /// `Some(alpha)` uses an EMA baseline instead of the centered SMA.
    pub ema_alpha: Option<f64>,
    pub threshold: f64,
    pub min_samples: usize,
}

impl Default for MovingAverageConfig {
    fn default() -> Self {
        Self {
            window: 5,
            ema_alpha: None,
            threshold: 2.0,
            min_samples: MIN_SAMPLES,
        }
    }
}

fn ema(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

fn severity_for(ratio: f64) -> Severity {
    if ratio >= 2.5 {
        Severity::Critical
    } else if ratio >= 2.0 {
        Severity::High
    } else {
        Severity::Medium
    }
}

pub fn moving_average_detect(values: &[f64], config: MovingAverageConfig) -> Vec<Anomaly> {
    if values.len() < config.min_samples {
        return Vec::new();
    }
    let baseline = match config.ema_alpha {
        Some(alpha) => ema(values, alpha),
        None => stats::moving_average(values, config.window),
    };
    let residuals: Vec<f64> = values
        .iter()
        .zip(baseline.iter())
        .map(|(v, b)| v - b)
        .collect();
    let sigma = stats::stddev(&residuals);
    if sigma.abs() < f64::EPSILON {
        return Vec::new();
    }
    residuals
        .iter()
        .enumerate()
        .filter_map(|(index, &residual)| {
            let ratio = residual.abs() / sigma;
            if ratio > config.threshold {
                Some(Anomaly {
                    index,
                    severity: severity_for(ratio),
                    deviation: residual,
                    lower_bound: baseline[index] - config.threshold * sigma,
                    upper_bound: baseline[index] + config.threshold * sigma,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_spike_against_flat_baseline() {
        let mut values = vec![10.0; 20];
        values[15] = 1000.0;
        let anomalies = moving_average_detect(&values, MovingAverageConfig::default());
        assert!(anomalies.iter().any(|a| a.index == 15));
    }

    #[test]
    fn zero_residual_sigma_yields_no_anomalies() {
        let values = vec![10.0; 15];
        assert!(moving_average_detect(&values, MovingAverageConfig::default()).is_empty());
    }

    #[test]
    fn ema_baseline_also_flags_spike() {
        let mut values = vec![10.0; 20];
        values[10] = 500.0;
        let config = MovingAverageConfig {
            ema_alpha: Some(0.3),
            ..Default::default()
        };
        let anomalies = moving_average_detect(&values, config);
        assert!(anomalies.iter().any(|a| a.index == 10));
    }
}
