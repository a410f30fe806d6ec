//! IQR detector: flags points outside `[Q1 - k*IQR, Q3 + k*IQR]`.

use crate::stats;

use super::{Anomaly, Severity, MIN_SAMPLES};

#[derive(Debug, Clone, Copy)]
pub struct IqrConfig {
    pub k: f64,
    pub min_samples: usize,
}

impl Default for IqrConfig {
    fn default() -> Self {
        Self {
            k: 1.5,
            min_samples: MIN_SAMPLES,
        }
    }
}

fn severity_for(multiples_beyond: f64) -> Severity {
    if multiples_beyond >= 3.0 {
        Severity::Critical
    } else if multiples_beyond >= 2.0 {
        Severity::High
    } else if multiples_beyond >= 1.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn iqr_detect(values: &[f64], config: IqrConfig) -> Vec<Anomaly> {
    if values.len() < config.min_samples {
        return Vec::new();
    }
    let q = stats::quartiles(values);
    let iqr = q.iqr();
    if iqr.abs() < f64::EPSILON {
        return Vec::new();
    }
    let lower = q.q1 - config.k * iqr;
    let upper = q.q3 + config.k * iqr;
    values
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            if value < lower {
                let multiples = (q.q1 - value) / iqr;
                Some(Anomaly {
                    index,
                    severity: severity_for(multiples),
                    deviation: value - q.q1,
                    lower_bound: lower,
                    upper_bound: upper,
                })
            } else if value > upper {
                let multiples = (value - q.q3) / iqr;
                Some(Anomaly {
                    index,
                    severity: severity_for(multiples),
                    deviation: value - q.q3,
                    lower_bound: lower,
                    upper_bound: upper,
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
    fn flags_value_far_outside_iqr() {
        let mut values: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        values.push(1000.0);
        let anomalies = iqr_detect(&values, IqrConfig::default());
        assert!(anomalies.iter().any(|a| a.index == values.len() - 1));
    }

    #[test]
    fn zero_iqr_yields_no_anomalies() {
        let values = vec![5.0; 15];
        assert!(iqr_detect(&values, IqrConfig::default()).is_empty());
    }

    #[test]
    fn severity_monotone_in_multiples() {
        assert!(severity_for(1.2) < severity_for(1.8));
        assert!(severity_for(1.8) < severity_for(2.5));
        assert!(severity_for(2.5) < severity_for(3.5));
    }
}
