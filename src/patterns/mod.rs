//! Time-Pattern Analyzer: per-hour/per-weekday usage statistics, rule-based
//! pattern classification, and cron-schedule synthesis for scheduled
//! scaling hints.

use chrono::{Datelike, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::stats;
use crate::types::Sample;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HourStat {
    pub hour: u32,
    pub count: usize,
    pub mean_cpu: f64,
    pub mean_mem: f64,
    pub max_cpu: f64,
    pub max_mem: f64,
    pub stddev_cpu: f64,
    pub stddev_mem: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeekdayStat {
    pub weekday: Weekday,
    pub count: usize,
    pub mean_cpu: f64,
    pub mean_mem: f64,
    pub max_cpu: f64,
    pub max_mem: f64,
    pub stddev_cpu: f64,
    pub stddev_mem: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternType {
    BusinessHours,
    NightBatch,
    WeekdayOnly,
    WeekendPeak,
    MorningSpike,
    EveningSpike,
    Custom,
    NoPattern,
}

#[derive(Debug, Clone, Copy)]
pub struct PatternConfig {
    pub significant_variation_cv: f64,
    pub peak_ratio: f64,
    pub off_peak_ratio: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            significant_variation_cv: 0.25,
            peak_ratio: 1.3,
            off_peak_ratio: 0.7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScalingSchedule {
    pub pattern: PatternType,
    /// One cron expression per transition, each paired with the
    /// cpu/memory multiplier that should apply from that point on.
    pub entries: Vec<ScheduleEntry>,
    pub estimated_savings_percent: f64,
}

#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub cron: String,
    pub cpu_multiplier: f64,
    pub memory_multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct TimePatternReport {
    pub hour_stats: [HourStat; 24],
    pub weekday_stats: [WeekdayStat; 7],
    pub coefficient_of_variation: f64,
    pub pattern: PatternType,
    pub peak_hours: Vec<u32>,
    pub schedule: Option<ScalingSchedule>,
}

fn workload_cpu(sample: &Sample) -> f64 {
    sample.containers.iter().map(|c| c.cpu_millicores).sum()
}

fn workload_mem(sample: &Sample) -> f64 {
    sample.containers.iter().map(|c| c.memory_bytes).sum()
}

fn weekday_index(w: Weekday) -> usize {
    w.num_days_from_monday() as usize
}

fn hour_stats(samples: &[Sample]) -> [HourStat; 24] {
    let mut buckets: Vec<Vec<(f64, f64)>> = vec![Vec::new(); 24];
    for s in samples {
        let hour = s.timestamp.hour() as usize;
        buckets[hour].push((workload_cpu(s), workload_mem(s)));
    }
    std::array::from_fn(|hour| {
        let cpu: Vec<f64> = buckets[hour].iter().map(|(c, _)| *c).collect();
        let mem: Vec<f64> = buckets[hour].iter().map(|(_, m)| *m).collect();
        HourStat {
            hour: hour as u32,
            count: cpu.len(),
            mean_cpu: stats::mean(&cpu),
            mean_mem: stats::mean(&mem),
            max_cpu: stats::max(&cpu),
            max_mem: stats::max(&mem),
            stddev_cpu: stats::stddev(&cpu),
            stddev_mem: stats::stddev(&mem),
        }
    })
}

const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_stats(samples: &[Sample]) -> [WeekdayStat; 7] {
    let mut buckets: Vec<Vec<(f64, f64)>> = vec![Vec::new(); 7];
    for s in samples {
        let idx = weekday_index(s.timestamp.weekday());
        buckets[idx].push((workload_cpu(s), workload_mem(s)));
    }
    std::array::from_fn(|idx| {
        let cpu: Vec<f64> = buckets[idx].iter().map(|(c, _)| *c).collect();
        let mem: Vec<f64> = buckets[idx].iter().map(|(_, m)| *m).collect();
        WeekdayStat {
            weekday: WEEKDAY_ORDER[idx],
            count: cpu.len(),
            mean_cpu: stats::mean(&cpu),
            mean_mem: stats::mean(&mem),
            max_cpu: stats::max(&cpu),
            max_mem: stats::max(&mem),
            stddev_cpu: stats::stddev(&cpu),
            stddev_mem: stats::stddev(&mem),
        }
    })
}

fn classify(hour_stats: &[HourStat; 24], weekday_stats: &[WeekdayStat; 7], config: PatternConfig) -> (PatternType, Vec<u32>) {
    let overall_mean = {
        let all: Vec<f64> = hour_stats.iter().filter(|h| h.count > 0).map(|h| h.mean_cpu).collect();
        stats::mean(&all)
    };
    let peak_threshold = overall_mean * config.peak_ratio;

    let peak_hours: Vec<u32> = hour_stats
        .iter()
        .filter(|h| h.count > 0 && h.mean_cpu >= peak_threshold)
        .map(|h| h.hour)
        .collect();

    let in_range = |hour: u32, start: u32, end: u32| -> bool {
        if start <= end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        }
    };

    let fraction_in_range = |start: u32, end: u32| -> f64 {
        if peak_hours.is_empty() {
            return 0.0;
        }
        let hits = peak_hours.iter().filter(|&&h| in_range(h, start, end)).count();
        hits as f64 / peak_hours.len() as f64
    };

    let weekend_off_peak = {
        let off_peak_threshold = overall_mean * config.off_peak_ratio;
        let sat = &weekday_stats[weekday_index(Weekday::Sat)];
        let sun = &weekday_stats[weekday_index(Weekday::Sun)];
        (sat.count == 0 || sat.mean_cpu <= off_peak_threshold) && (sun.count == 0 || sun.mean_cpu <= off_peak_threshold)
    };

    let weekend_peak = {
        let peak_threshold_day = overall_mean * config.peak_ratio;
        let sat = &weekday_stats[weekday_index(Weekday::Sat)];
        let sun = &weekday_stats[weekday_index(Weekday::Sun)];
        sat.mean_cpu >= peak_threshold_day || sun.mean_cpu >= peak_threshold_day
    };

    let pattern = if !peak_hours.is_empty() && peak_hours.len() >= 3 && fraction_in_range(8, 18) >= 0.70 {
        PatternType::BusinessHours
    } else if !peak_hours.is_empty() && fraction_in_range(22, 6) >= 0.70 {
        PatternType::NightBatch
    } else if weekend_off_peak {
        PatternType::WeekdayOnly
    } else if weekend_peak {
        PatternType::WeekendPeak
    } else if (2..=4).contains(&peak_hours.len()) && fraction_in_range(6, 11) >= 0.70 {
        PatternType::MorningSpike
    } else if (2..=4).contains(&peak_hours.len()) && fraction_in_range(17, 22) >= 0.70 {
        PatternType::EveningSpike
    } else {
        PatternType::Custom
    };

    (pattern, peak_hours)
}

/// Measured ratio of off-peak to peak hourly CPU means, clamped to
/// `(0, 1]`. Falls back to `config.off_peak_ratio` when there isn't
/// enough bucketed data on either side to measure it directly (e.g. every
/// hour classified as peak).
fn measured_off_peak_ratio(hour_stats: &[HourStat; 24], peak_hours: &[u32], config: PatternConfig) -> f64 {
    let peak_means: Vec<f64> = hour_stats.iter().filter(|h| h.count > 0 && peak_hours.contains(&h.hour)).map(|h| h.mean_cpu).collect();
    let off_peak_means: Vec<f64> = hour_stats.iter().filter(|h| h.count > 0 && !peak_hours.contains(&h.hour)).map(|h| h.mean_cpu).collect();
    if peak_means.is_empty() || off_peak_means.is_empty() {
        return config.off_peak_ratio;
    }
    let peak_mean = stats::mean(&peak_means);
    if peak_mean.abs() < f64::EPSILON {
        return config.off_peak_ratio;
    }
    (stats::mean(&off_peak_means) / peak_mean).clamp(0.0, 1.0)
}

fn synthesize_schedule(pattern: PatternType, peak_hours: &[u32], hour_stats: &[HourStat; 24], config: PatternConfig) -> Option<ScalingSchedule> {
    if matches!(pattern, PatternType::NoPattern) {
        return None;
    }

    let off_peak_hours = 24 - peak_hours.len().min(24);
    let off_peak_multiplier = measured_off_peak_ratio(hour_stats, peak_hours, config);
    let estimated_savings_percent = (1.0 - off_peak_multiplier) * (off_peak_hours as f64 / 24.0) * 100.0;

    // The peak entry restores baseline sizing (1.0); the off-peak entry
    // scales down by the measured off-peak/peak usage ratio rather than
    // reusing the peak/off-peak classification thresholds themselves.
    let entries = match pattern {
        PatternType::BusinessHours => vec![
            ScheduleEntry {
                cron: "0 8 * * 1-5".to_string(),
                cpu_multiplier: 1.0,
                memory_multiplier: 1.0,
            },
            ScheduleEntry {
                cron: "0 18 * * 1-5".to_string(),
                cpu_multiplier: off_peak_multiplier,
                memory_multiplier: off_peak_multiplier,
            },
        ],
        PatternType::NightBatch => vec![
            ScheduleEntry {
                cron: "0 22 * * *".to_string(),
                cpu_multiplier: 1.0,
                memory_multiplier: 1.0,
            },
            ScheduleEntry {
                cron: "0 6 * * *".to_string(),
                cpu_multiplier: off_peak_multiplier,
                memory_multiplier: off_peak_multiplier,
            },
        ],
        PatternType::WeekdayOnly => vec![
            ScheduleEntry {
                cron: "0 0 * * 1".to_string(),
                cpu_multiplier: 1.0,
                memory_multiplier: 1.0,
            },
            ScheduleEntry {
                cron: "0 0 * * 6".to_string(),
                cpu_multiplier: off_peak_multiplier,
                memory_multiplier: off_peak_multiplier,
            },
        ],
        PatternType::WeekendPeak => vec![
            ScheduleEntry {
                cron: "0 0 * * 6".to_string(),
                cpu_multiplier: 1.0,
                memory_multiplier: 1.0,
            },
            ScheduleEntry {
                cron: "0 0 * * 1".to_string(),
                cpu_multiplier: off_peak_multiplier,
                memory_multiplier: off_peak_multiplier,
            },
        ],
        PatternType::MorningSpike => vec![
            ScheduleEntry {
                cron: "0 6 * * *".to_string(),
                cpu_multiplier: 1.0,
                memory_multiplier: 1.0,
            },
            ScheduleEntry {
                cron: "0 11 * * *".to_string(),
                cpu_multiplier: off_peak_multiplier,
                memory_multiplier: off_peak_multiplier,
            },
        ],
        PatternType::EveningSpike => vec![
            ScheduleEntry {
                cron: "0 17 * * *".to_string(),
                cpu_multiplier: 1.0,
                memory_multiplier: 1.0,
            },
            ScheduleEntry {
                cron: "0 22 * * *".to_string(),
                cpu_multiplier: off_peak_multiplier,
                memory_multiplier: off_peak_multiplier,
            },
        ],
        PatternType::Custom | PatternType::NoPattern => Vec::new(),
    };

    Some(ScalingSchedule {
        pattern,
        entries,
        estimated_savings_percent,
    })
}

/// Analyze a workload's full sample history for time-of-day/day-of-week
/// patterns. Samples should span at least a few days for the result to be
/// meaningful; fewer hour/weekday buckets simply come back with count=0.
pub fn analyze(samples: &[Sample], config: PatternConfig) -> TimePatternReport {
    let hour_stats = hour_stats(samples);
    let weekday_stats = weekday_stats(samples);

    let cpu_series: Vec<f64> = samples.iter().map(workload_cpu).collect();
    let overall_mean = stats::mean(&cpu_series);
    let overall_stddev = stats::stddev(&cpu_series);
    let cv = if overall_mean.abs() > f64::EPSILON {
        overall_stddev / overall_mean
    } else {
        0.0
    };

    if cv < config.significant_variation_cv {
        return TimePatternReport {
            hour_stats,
            weekday_stats,
            coefficient_of_variation: cv,
            pattern: PatternType::NoPattern,
            peak_hours: Vec::new(),
            schedule: None,
        };
    }

    let (pattern, peak_hours) = classify(&hour_stats, &weekday_stats, config);
    let schedule = synthesize_schedule(pattern, &peak_hours, &hour_stats, config);

    TimePatternReport {
        hour_stats,
        weekday_stats,
        coefficient_of_variation: cv,
        pattern,
        peak_hours,
        schedule,
    }
}
