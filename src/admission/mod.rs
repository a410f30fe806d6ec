//! Admission Validator: structural validation of the `Config` object
//! (§6). Every rule below is independent, so `validate` collects every
//! violation rather than stopping at the first — a webhook rejecting a
//! `Config` should tell the tenant everything wrong with it in one pass.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::types::{Config, MaintenanceWindow, RecommendationKnobs, SlaDefinition};

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("static pattern"))
}

fn git_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(https?://|git@)[\w\-.]+(:\d+)?(/|:)[\w\-./]+\.git$").expect("static pattern"))
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("targetNamespaces must not be empty")]
    EmptyTargetNamespaces,
    #[error("invalid namespace name '{0}': must match ^[a-z0-9]([-a-z0-9]*[a-z0-9])?$")]
    InvalidNamespaceName(String),
    #[error("{field} percentile {value} out of range [50,99]")]
    PercentileOutOfRange { field: &'static str, value: f64 },
    #[error("safetyMargin {0} out of range [1.0,3.0]")]
    SafetyMarginOutOfRange(f64),
    #[error("minSamples {0} below minimum of 10")]
    MinSamplesTooLow(usize),
    #[error("{field} confidence value {value} out of range [0,100]")]
    ConfidenceOutOfRange { field: &'static str, value: f64 },
    #[error("{field} change percent {value} out of range [0,100]")]
    ChangePercentOutOfRange { field: &'static str, value: f64 },
    #[error("resource threshold for {field}: min ({min}) >= max ({max}), or non-positive")]
    InvalidResourceThreshold { field: &'static str, min: f64, max: f64 },
    #[error("maintenance window {index} has an invalid cron expression '{cron}': {detail}")]
    InvalidCron { index: usize, cron: String, detail: String },
    #[error("maintenance window {index} has a non-positive duration")]
    InvalidWindowDuration { index: usize },
    #[error("maintenance window {index} has an unresolvable timezone '{timezone}'")]
    InvalidTimezone { index: usize, timezone: String },
    #[error("gitops.gitUrl '{0}' does not match the required pattern for autoCommit")]
    InvalidGitUrl(String),
    #[error("gitops.autoCommit is enabled but gitUrl is unset")]
    MissingGitUrl,
    #[error("excludeWorkloads pattern '{pattern}' is not a valid regex: {detail}")]
    InvalidExcludeRegex { pattern: String, detail: String },
    #[error("sla definition '{name}' has a non-positive window")]
    InvalidSlaWindow { name: String },
}

fn validate_namespaces(config: &Config, issues: &mut Vec<ValidationIssue>) {
    if config.target_namespaces.is_empty() {
        issues.push(ValidationIssue::EmptyTargetNamespaces);
        return;
    }
    for ns in &config.target_namespaces {
        if !namespace_re().is_match(ns) {
            issues.push(ValidationIssue::InvalidNamespaceName(ns.clone()));
        }
    }
}

fn validate_knobs(knobs: &RecommendationKnobs, issues: &mut Vec<ValidationIssue>) {
    if !(50.0..=99.0).contains(&knobs.cpu_percentile) {
        issues.push(ValidationIssue::PercentileOutOfRange { field: "cpuPercentile", value: knobs.cpu_percentile });
    }
    if !(50.0..=99.0).contains(&knobs.mem_percentile) {
        issues.push(ValidationIssue::PercentileOutOfRange { field: "memPercentile", value: knobs.mem_percentile });
    }
    if !(1.0..=3.0).contains(&knobs.safety_margin) {
        issues.push(ValidationIssue::SafetyMarginOutOfRange(knobs.safety_margin));
    }
    if knobs.min_samples < 10 {
        issues.push(ValidationIssue::MinSamplesTooLow(knobs.min_samples));
    }
    if !(0.0..=100.0).contains(&knobs.min_confidence) {
        issues.push(ValidationIssue::ConfidenceOutOfRange { field: "minConfidence", value: knobs.min_confidence });
    }
    if !(0.0..=100.0).contains(&knobs.max_change_percent) {
        issues.push(ValidationIssue::ChangePercentOutOfRange { field: "maxChangePercent", value: knobs.max_change_percent });
    }
    if knobs.min_millicores >= knobs.max_millicores || knobs.min_millicores <= 0.0 {
        issues.push(ValidationIssue::InvalidResourceThreshold {
            field: "millicores",
            min: knobs.min_millicores,
            max: knobs.max_millicores,
        });
    }
    if knobs.min_megabytes >= knobs.max_megabytes || knobs.min_megabytes <= 0.0 {
        issues.push(ValidationIssue::InvalidResourceThreshold {
            field: "megabytes",
            min: knobs.min_megabytes,
            max: knobs.max_megabytes,
        });
    }
}

fn validate_window(index: usize, window: &MaintenanceWindow, issues: &mut Vec<ValidationIssue>) {
    if window.duration_minutes == 0 {
        issues.push(ValidationIssue::InvalidWindowDuration { index });
    }
    if let Err(e) = cron::Schedule::from_str(&window.cron) {
        issues.push(ValidationIssue::InvalidCron { index, cron: window.cron.clone(), detail: e.to_string() });
    }
    if chrono_tz::Tz::from_str(&window.timezone).is_err() {
        issues.push(ValidationIssue::InvalidTimezone { index, timezone: window.timezone.clone() });
    }
}

fn validate_gitops(config: &Config, issues: &mut Vec<ValidationIssue>) {
    if !config.gitops.enabled || !config.gitops.auto_commit {
        return;
    }
    match &config.gitops.git_url {
        None => issues.push(ValidationIssue::MissingGitUrl),
        Some(url) if !git_url_re().is_match(url) => issues.push(ValidationIssue::InvalidGitUrl(url.clone())),
        Some(_) => {}
    }
}

fn validate_excludes(config: &Config, issues: &mut Vec<ValidationIssue>) {
    for pattern in &config.exclude_workloads {
        if let Err(e) = Regex::new(pattern) {
            issues.push(ValidationIssue::InvalidExcludeRegex { pattern: pattern.clone(), detail: e.to_string() });
        }
    }
}

fn validate_sla(definitions: &[SlaDefinition], issues: &mut Vec<ValidationIssue>) {
    for def in definitions {
        if def.window_minutes == 0 {
            issues.push(ValidationIssue::InvalidSlaWindow { name: def.name.clone() });
        }
    }
}

/// Validate the full `Config` object, returning every violation found.
/// An empty result means the object is admissible.
pub fn validate(config: &Config) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    validate_namespaces(config, &mut issues);
    if let Some(overrides) = &config.profile_overrides {
        // Overrides are validated after being merged onto a profile's
        // defaults; an override-only pass would reject harmless partial
        // overrides (e.g. only `minSamples` set). Validate the resolved
        // knobs the reconciler will actually use instead.
        let resolved = crate::profile::resolve(config.profile, Some(overrides), config.dry_run);
        validate_knobs(&resolved.knobs, &mut issues);
    } else {
        let resolved = crate::profile::resolve(config.profile, None, config.dry_run);
        validate_knobs(&resolved.knobs, &mut issues);
    }
    for (index, window) in config.maintenance_windows.iter().enumerate() {
        validate_window(index, window, &mut issues);
    }
    validate_gitops(config, &mut issues);
    validate_excludes(config, &mut issues);
    validate_sla(&config.sla_definitions, &mut issues);

    issues
}

pub fn is_admissible(config: &Config) -> bool {
    validate(config).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AutoscalerAwareness, CircuitBreakerConfig, DisruptionBudgetAwareness, GitOpsExportConfig, Profile, Strategy, WorkloadKind,
    };

    fn valid_config() -> Config {
        Config {
            name: "tenant-a".to_string(),
            enabled: true,
            target_namespaces: vec!["production".to_string()],
            target_kinds: vec![WorkloadKind::Deployment],
            exclude_workloads: vec!["^kube-.*".to_string()],
            strategy: Strategy::Balanced,
            profile: Profile::Staging,
            profile_overrides: None,
            dry_run: false,
            circuit_breaker: CircuitBreakerConfig::default(),
            autoscaler_awareness: AutoscalerAwareness::default(),
            disruption_budget_awareness: DisruptionBudgetAwareness::default(),
            maintenance_windows: vec![MaintenanceWindow {
                cron: "0 2 * * *".to_string(),
                duration_minutes: 60,
                timezone: "UTC".to_string(),
            }],
            gitops: GitOpsExportConfig::default(),
            sla_definitions: vec![],
            generation: 1,
        }
    }

    #[test]
    fn valid_config_is_admissible() {
        assert!(is_admissible(&valid_config()));
    }

    #[test]
    fn empty_target_namespaces_is_rejected() {
        let mut config = valid_config();
        config.target_namespaces.clear();
        assert!(validate(&config).contains(&ValidationIssue::EmptyTargetNamespaces));
    }

    #[test]
    fn uppercase_namespace_is_rejected() {
        let mut config = valid_config();
        config.target_namespaces = vec!["Production".to_string()];
        assert!(matches!(validate(&config)[0], ValidationIssue::InvalidNamespaceName(_)));
    }

    #[test]
    fn invalid_cron_is_rejected() {
        let mut config = valid_config();
        config.maintenance_windows[0].cron = "not a cron".to_string();
        let issues = validate(&config);
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidCron { .. })));
    }

    #[test]
    fn unresolvable_timezone_is_rejected() {
        let mut config = valid_config();
        config.maintenance_windows[0].timezone = "Mars/Olympus".to_string();
        let issues = validate(&config);
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidTimezone { .. })));
    }

    #[test]
    fn auto_commit_without_git_url_is_rejected() {
        let mut config = valid_config();
        config.gitops.enabled = true;
        config.gitops.auto_commit = true;
        config.gitops.git_url = None;
        assert!(validate(&config).contains(&ValidationIssue::MissingGitUrl));
    }

    #[test]
    fn malformed_git_url_is_rejected() {
        let mut config = valid_config();
        config.gitops.enabled = true;
        config.gitops.auto_commit = true;
        config.gitops.git_url = Some("not-a-url".to_string());
        let issues = validate(&config);
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidGitUrl(_))));
    }

    #[test]
    fn valid_https_git_url_is_accepted() {
        let mut config = valid_config();
        config.gitops.enabled = true;
        config.gitops.auto_commit = true;
        config.gitops.git_url = Some("https://github.com/acme/gitops-repo.git".to_string());
        assert!(is_admissible(&config));
    }

    #[test]
    fn invalid_exclude_regex_is_rejected() {
        let mut config = valid_config();
        config.exclude_workloads = vec!["(unclosed".to_string()];
        let issues = validate(&config);
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidExcludeRegex { .. })));
    }

    #[test]
    fn min_samples_below_ten_is_rejected() {
        let mut config = valid_config();
        config.profile_overrides = Some(crate::types::ProfileOverrides {
            min_samples: Some(5),
            ..Default::default()
        });
        let issues = validate(&config);
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::MinSamplesTooLow(5))));
    }
}
