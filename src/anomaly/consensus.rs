//! Consensus detector: runs Z-score, IQR, and moving-average over the
//! same series and emits an anomaly only for indices flagged by at least
//! `min_agreement` of them.

use std::collections::HashMap;

use super::{
    iqr::{iqr_detect, IqrConfig},
    moving_average::{moving_average_detect, MovingAverageConfig},
    zscore::{zscore_detect, ZScoreConfig},
    Anomaly, Severity,
};

#[derive(Debug, Clone, Copy)]
pub struct ConsensusConfig {
    pub min_agreement: usize,
    pub zscore: ZScoreConfig,
    pub iqr: IqrConfig,
    pub moving_average: MovingAverageConfig,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_agreement: 2,
            zscore: ZScoreConfig::default(),
            iqr: IqrConfig::default(),
            moving_average: MovingAverageConfig::default(),
        }
    }
}

/// Run all three detectors and keep only indices flagged by at least
/// `min_agreement` of them. Output severity is the max across agreeing
/// methods; deviation and bounds are the mean across them.
pub fn consensus_detect(values: &[f64], config: ConsensusConfig) -> Vec<Anomaly> {
    let runs: [Vec<Anomaly>; 3] = [
        zscore_detect(values, config.zscore),
        iqr_detect(values, config.iqr),
        moving_average_detect(values, config.moving_average),
    ];

    let mut by_index: HashMap<usize, Vec<Anomaly>> = HashMap::new();
    for run in &runs {
        for anomaly in run {
            by_index.entry(anomaly.index).or_default().push(anomaly.clone());
        }
    }

    let mut out: Vec<Anomaly> = by_index
        .into_iter()
        .filter(|(_, hits)| hits.len() >= config.min_agreement)
        .map(|(index, hits)| {
            let severity = hits.iter().map(|a| a.severity).max().unwrap_or(Severity::Low);
            let n = hits.len() as f64;
            let deviation = hits.iter().map(|a| a.deviation).sum::<f64>() / n;
            let lower_bound = hits.iter().map(|a| a.lower_bound).sum::<f64>() / n;
            let upper_bound = hits.iter().map(|a| a.upper_bound).sum::<f64>() / n;
            Anomaly {
                index,
                severity,
                deviation,
                lower_bound,
                upper_bound,
            }
        })
        .collect();
    out.sort_by_key(|a| a.index);
    out
}
