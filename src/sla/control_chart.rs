//! Two-pass control-chart outlier detector: a robust modified-z-score
//! screen followed by recomputed control limits on the screened series.

use crate::stats;

#[derive(Debug, Clone, Copy)]
pub struct ControlChartConfig {
    /// Modified-z-score threshold for the screening pass.
    pub screen_threshold: f64,
    /// Sigma multiplier for the recomputed upper/lower control limits.
    pub k: f64,
    /// Clamp LCL at 0 for metrics that cannot go negative (CPU, memory,
    /// latency, error counts).
    pub non_negative: bool,
    /// If `Some(n)`, also flag strictly monotonic runs of length `n` as
    /// trend outliers.
    pub trend_window_size: Option<usize>,
}

impl Default for ControlChartConfig {
    fn default() -> Self {
        Self {
            screen_threshold: 3.5,
            k: 3.0,
            non_negative: true,
            trend_window_size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierKind {
    ControlLimit,
    Trend,
}

#[derive(Debug, Clone, Copy)]
pub struct Outlier {
    pub index: usize,
    pub kind: OutlierKind,
}

#[derive(Debug, Clone)]
pub struct ControlChartResult {
    pub mean: f64,
    pub stddev: f64,
    pub ucl: f64,
    pub lcl: f64,
    pub outliers: Vec<Outlier>,
}

fn modified_zscore(values: &[f64]) -> Vec<f64> {
    let median = stats::quartiles(values).median;
    let mad = stats::mad(values);
    if mad.abs() < f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| 0.6745 * (v - median).abs() / mad).collect()
}

fn is_strictly_monotonic(window: &[f64]) -> bool {
    if window.len() < 2 {
        return false;
    }
    let increasing = window.windows(2).all(|w| w[1] > w[0]);
    let decreasing = window.windows(2).all(|w| w[1] < w[0]);
    increasing || decreasing
}

/// Run the two-pass control chart detector over `values`.
pub fn detect(values: &[f64], config: ControlChartConfig) -> ControlChartResult {
    if values.is_empty() {
        return ControlChartResult {
            mean: 0.0,
            stddev: 0.0,
            ucl: 0.0,
            lcl: 0.0,
            outliers: Vec::new(),
        };
    }

    let scores = modified_zscore(values);
    let screened: Vec<f64> = values
        .iter()
        .zip(scores.iter())
        .filter(|(_, &s)| s <= config.screen_threshold)
        .map(|(&v, _)| v)
        .collect();

    let clean = if screened.is_empty() { values.to_vec() } else { screened };
    let mean = stats::mean(&clean);
    let sigma = stats::stddev(&clean);
    let ucl = mean + config.k * sigma;
    let mut lcl = mean - config.k * sigma;
    if config.non_negative {
        lcl = lcl.max(0.0);
    }

    let mut outliers: Vec<Outlier> = values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v < lcl || v > ucl)
        .map(|(index, _)| Outlier {
            index,
            kind: OutlierKind::ControlLimit,
        })
        .collect();

    if let Some(window_size) = config.trend_window_size {
        if window_size >= 2 {
            for start in 0..values.len().saturating_sub(window_size - 1) {
                let window = &values[start..start + window_size];
                if is_strictly_monotonic(window) {
                    for (offset, _) in window.iter().enumerate() {
                        let index = start + offset;
                        if !outliers.iter().any(|o| o.index == index && o.kind == OutlierKind::Trend) {
                            outliers.push(Outlier {
                                index,
                                kind: OutlierKind::Trend,
                            });
                        }
                    }
                }
            }
        }
    }

    outliers.sort_by_key(|o| o.index);
    ControlChartResult {
        mean,
        stddev: sigma,
        ucl,
        lcl,
        outliers,
    }
}
