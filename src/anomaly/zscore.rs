//! Z-score detector: flags points whose standard score exceeds a
//! threshold. Severity is monotone in |z| (spec testable property #4).

use crate::stats;

use super::{Anomaly, Severity, MIN_SAMPLES};

#[derive(Debug, Clone, Copy)]
pub struct ZScoreConfig {
    pub threshold: f64,
    pub min_samples: usize,
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            min_samples: MIN_SAMPLES,
        }
    }
}

fn severity_for(abs_z: f64) -> Severity {
    if abs_z >= 5.0 {
        Severity::Critical
    } else if abs_z >= 4.0 {
        Severity::High
    } else {
        Severity::Medium
    }
}

pub fn zscore_detect(values: &[f64], config: ZScoreConfig) -> Vec<Anomaly> {
    if values.len() < config.min_samples {
        return Vec::new();
    }
    let mean = stats::mean(values);
    let sigma = stats::stddev(values);
    if sigma.abs() < f64::EPSILON {
        return Vec::new();
    }
    values
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            let z = (value - mean) / sigma;
            if z.abs() > config.threshold {
                Some(Anomaly {
                    index,
                    severity: severity_for(z.abs()),
                    deviation: z,
                    lower_bound: mean - config.threshold * sigma,
                    upper_bound: mean + config.threshold * sigma,
                })
            } else {
                None
            }
        })
        .collect()
}
