//! Holt-Winters seasonal forecasting and classical decomposition, used to
//! synthesize scheduled-scaling hints alongside the time-pattern analyzer.

pub mod decompose;
pub mod holt_winters;

pub use decompose::{decompose, detect_seasonal_period, Decomposition, SeasonalityType};
pub use holt_winters::{fit, forecast, HoltWintersError, HoltWintersFit, HoltWintersParams};

/// Error metrics computed between fitted and observed values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub mape: f64,
    pub smape: f64,
}

pub fn error_metrics(actual: &[f64], fitted: &[f64]) -> ErrorMetrics {
    let n = actual.len().min(fitted.len());
    if n == 0 {
        return ErrorMetrics {
            mae: 0.0,
            mse: 0.0,
            rmse: 0.0,
            mape: 0.0,
            smape: 0.0,
        };
    }
    let mut abs_err_sum = 0.0;
    let mut sq_err_sum = 0.0;
    let mut mape_sum = 0.0;
    let mut mape_count = 0usize;
    let mut smape_sum = 0.0;
    let mut smape_count = 0usize;
    for i in 0..n {
        let err = actual[i] - fitted[i];
        abs_err_sum += err.abs();
        sq_err_sum += err * err;
        if actual[i].abs() > f64::EPSILON {
            mape_sum += (err / actual[i]).abs();
            mape_count += 1;
        }
        let denom = (actual[i].abs() + fitted[i].abs()) / 2.0;
        if denom > f64::EPSILON {
            smape_sum += (err.abs()) / denom;
            smape_count += 1;
        }
    }
    let mse = sq_err_sum / n as f64;
    ErrorMetrics {
        mae: abs_err_sum / n as f64,
        mse,
        rmse: mse.sqrt(),
        mape: if mape_count > 0 {
            (mape_sum / mape_count as f64) * 100.0
        } else {
            0.0
        },
        smape: if smape_count > 0 {
            (smape_sum / smape_count as f64) * 100.0
        } else {
            0.0
        },
    }
}
