//! Triple exponential smoothing (Holt-Winters) with additive or
//! multiplicative seasonality and optional damped trend.

use thiserror::Error;

use crate::stats;

use super::decompose::SeasonalityType;

#[derive(Debug, Error, PartialEq)]
pub enum HoltWintersError {
    #[error("seasonal period must be at least 2, got {0}")]
    InvalidPeriod(usize),
    #[error("need at least {required} data points ({min_data_points} * period {period}), got {actual}")]
    InsufficientData {
        required: usize,
        min_data_points: usize,
        period: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct HoltWintersParams {
    pub period: usize,
    pub seasonality: SeasonalityType,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    /// `Some(phi)` enables a damped trend with damping factor `phi` in (0,1].
    pub damped_phi: Option<f64>,
    pub min_data_points: usize,
}

impl HoltWintersParams {
    pub fn new(period: usize, seasonality: SeasonalityType) -> Self {
        Self {
            period,
            seasonality,
            alpha: 0.0,
            beta: 0.0,
            gamma: 0.0,
            damped_phi: None,
            min_data_points: 2,
        }
    }

    fn needs_grid_search(&self) -> bool {
        self.alpha == 0.0 && self.beta == 0.0 && self.gamma == 0.0
    }
}

#[derive(Debug, Clone)]
pub struct HoltWintersFit {
    pub params: HoltWintersParams,
    pub level: f64,
    pub trend: f64,
    pub seasonals: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residual_stddev: f64,
}

fn initialize(data: &[f64], period: usize, seasonality: SeasonalityType) -> (f64, f64, Vec<f64>) {
    let first_season = &data[..period];
    let second_season = &data[period..period * 2];

    let level = stats::mean(first_season);

    let trend = if data.len() >= period * 2 {
        let diffs: Vec<f64> = first_season
            .iter()
            .zip(second_season.iter())
            .map(|(a, b)| (b - a) / period as f64)
            .collect();
        stats::mean(&diffs)
    } else {
        0.0
    };

    let mut seasonals: Vec<f64> = match seasonality {
        SeasonalityType::Additive => first_season.iter().map(|v| v - level).collect(),
        SeasonalityType::Multiplicative => first_season
            .iter()
            .map(|v| if level.abs() > f64::EPSILON { v / level } else { 1.0 })
            .collect(),
    };

    match seasonality {
        SeasonalityType::Additive => {
            let mean_seasonal = stats::mean(&seasonals);
            for s in &mut seasonals {
                *s -= mean_seasonal;
            }
        }
        SeasonalityType::Multiplicative => {
            let mean_seasonal = stats::mean(&seasonals);
            if mean_seasonal.abs() > f64::EPSILON {
                for s in &mut seasonals {
                    *s /= mean_seasonal;
                }
            }
        }
    }

    (level, trend, seasonals)
}

fn run_once(
    data: &[f64],
    period: usize,
    seasonality: SeasonalityType,
    alpha: f64,
    beta: f64,
    gamma: f64,
) -> (f64, f64, Vec<f64>, Vec<f64>) {
    let (mut level, mut trend, mut seasonals) = initialize(data, period, seasonality);
    let mut fitted = vec![0.0; data.len()];

    for t in 0..data.len() {
        let seasonal_index = t % period;
        let prior_seasonal = seasonals[seasonal_index];

        fitted[t] = match seasonality {
            SeasonalityType::Additive => level + trend + prior_seasonal,
            SeasonalityType::Multiplicative => (level + trend) * prior_seasonal,
        };

        let y = data[t];
        let (new_level, new_trend, new_seasonal) = match seasonality {
            SeasonalityType::Additive => {
                let new_level = alpha * (y - prior_seasonal) + (1.0 - alpha) * (level + trend);
                let new_trend = beta * (new_level - level) + (1.0 - beta) * trend;
                let new_seasonal = gamma * (y - new_level) + (1.0 - gamma) * prior_seasonal;
                (new_level, new_trend, new_seasonal)
            }
            SeasonalityType::Multiplicative => {
                let denom = if prior_seasonal.abs() > f64::EPSILON { prior_seasonal } else { 1.0 };
                let new_level = alpha * (y / denom) + (1.0 - alpha) * (level + trend);
                let new_trend = beta * (new_level - level) + (1.0 - beta) * trend;
                let new_seasonal = if new_level.abs() > f64::EPSILON {
                    gamma * (y / new_level) + (1.0 - gamma) * prior_seasonal
                } else {
                    prior_seasonal
                };
                (new_level, new_trend, new_seasonal)
            }
        };

        level = new_level;
        trend = new_trend;
        seasonals[seasonal_index] = new_seasonal;
    }

    (level, trend, seasonals, fitted)
}

fn sse_beyond_first_season(data: &[f64], period: usize, fitted: &[f64]) -> f64 {
    data.iter()
        .zip(fitted.iter())
        .skip(period)
        .map(|(y, f)| (y - f).powi(2))
        .sum()
}

fn frange(start: f64, end_inclusive: f64, step: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut v = start;
    while v <= end_inclusive + 1e-9 {
        out.push(v);
        v += step;
    }
    out
}

/// Fit Holt-Winters to `data`. If all of alpha/beta/gamma are left at 0.0
/// in `params`, runs a coarse grid search minimizing one-step-ahead SSE
/// beyond the first season.
pub fn fit(data: &[f64], mut params: HoltWintersParams) -> Result<HoltWintersFit, HoltWintersError> {
    if params.period < 2 {
        return Err(HoltWintersError::InvalidPeriod(params.period));
    }
    let required = params.min_data_points.max(2) * params.period;
    if data.len() < required {
        return Err(HoltWintersError::InsufficientData {
            required,
            min_data_points: params.min_data_points.max(2),
            period: params.period,
            actual: data.len(),
        });
    }

    if params.needs_grid_search() {
        let mut best: Option<(f64, f64, f64, f64)> = None;
        for alpha in frange(0.1, 0.9, 0.1) {
            for beta in frange(0.01, 0.5, 0.05) {
                for gamma in frange(0.01, 0.5, 0.05) {
                    let (_, _, _, fitted) =
                        run_once(data, params.period, params.seasonality, alpha, beta, gamma);
                    let sse = sse_beyond_first_season(data, params.period, &fitted);
                    if best.is_none() || sse < best.unwrap().3 {
                        best = Some((alpha, beta, gamma, sse));
                    }
                }
            }
        }
        if let Some((alpha, beta, gamma, _)) = best {
            params.alpha = alpha;
            params.beta = beta;
            params.gamma = gamma;
        }
    }

    let (level, trend, seasonals, fitted) = run_once(
        data,
        params.period,
        params.seasonality,
        params.alpha,
        params.beta,
        params.gamma,
    );

    let residuals: Vec<f64> = data.iter().zip(fitted.iter()).map(|(y, f)| y - f).collect();
    let residual_stddev = stats::stddev(&residuals);

    Ok(HoltWintersFit {
        params,
        level,
        trend,
        seasonals,
        fitted,
        residual_stddev,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct ForecastPoint {
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Forecast `horizon` steps ahead. `z` is the normal-quantile multiplier
/// for the prediction interval (1.96 for ~95%).
pub fn forecast(fit: &HoltWintersFit, horizon: usize, z: f64) -> Vec<ForecastPoint> {
    let period = fit.params.period;
    (1..=horizon)
        .map(|h| {
            let seasonal_index = (h - 1) % period;
            let seasonal = fit.seasonals[seasonal_index];

            let trend_term = match fit.params.damped_phi {
                Some(phi) => {
                    let phi = phi.clamp(0.0, 1.0);
                    fit.trend * (1..=h).map(|i| phi.powi(i as i32)).sum::<f64>()
                }
                None => fit.trend * h as f64,
            };

            let value = match fit.params.seasonality {
                SeasonalityType::Additive => fit.level + trend_term + seasonal,
                SeasonalityType::Multiplicative => (fit.level + trend_term) * seasonal,
            };

            let spread = z * fit.residual_stddev * (h as f64).sqrt();
            ForecastPoint {
                value,
                lower: value - spread,
                upper: value + spread,
            }
        })
        .collect()
}
