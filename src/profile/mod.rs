//! Profile Resolver: named profile defaults layered with structured
//! overrides, producing frozen `ResolvedSettings` plus the `ShouldApply`
//! gate used by the recommendation/safety pipeline.

use crate::types::{Profile, ProfileOverrides, RecommendationKnobs};

/// Named-profile defaults for the 15 recommendation knobs.
pub fn profile_defaults(profile: Profile) -> RecommendationKnobs {
    match profile {
        Profile::Production => RecommendationKnobs {
            cpu_percentile: 95.0,
            mem_percentile: 95.0,
            safety_margin: 1.3,
            min_samples: 50,
            history_window_hours: 168,
            min_millicores: 50.0,
            max_millicores: 64_000.0,
            min_megabytes: 64.0,
            max_megabytes: 256_000.0,
            min_confidence: 70.0,
            max_change_percent: 40.0,
            require_approval: true,
            oom_boost_default: 1.2,
            confidence_floor_samples: 200,
            significant_variation_cv: 0.25,
        },
        Profile::Staging => RecommendationKnobs {
            cpu_percentile: 90.0,
            mem_percentile: 90.0,
            safety_margin: 1.2,
            min_samples: 30,
            history_window_hours: 72,
            min_millicores: 20.0,
            max_millicores: 32_000.0,
            min_megabytes: 32.0,
            max_megabytes: 128_000.0,
            min_confidence: 50.0,
            max_change_percent: 60.0,
            require_approval: false,
            oom_boost_default: 1.2,
            confidence_floor_samples: 100,
            significant_variation_cv: 0.25,
        },
        Profile::Development => RecommendationKnobs {
            cpu_percentile: 80.0,
            mem_percentile: 80.0,
            safety_margin: 1.1,
            min_samples: 10,
            history_window_hours: 24,
            min_millicores: 10.0,
            max_millicores: 16_000.0,
            min_megabytes: 16.0,
            max_megabytes: 64_000.0,
            min_confidence: 0.0,
            max_change_percent: 100.0,
            require_approval: false,
            oom_boost_default: 1.2,
            confidence_floor_samples: 50,
            significant_variation_cv: 0.3,
        },
        Profile::Test => RecommendationKnobs {
            cpu_percentile: 50.0,
            mem_percentile: 50.0,
            safety_margin: 1.0,
            min_samples: 10,
            history_window_hours: 1,
            min_millicores: 1.0,
            max_millicores: 8_000.0,
            min_megabytes: 1.0,
            max_megabytes: 32_000.0,
            min_confidence: 0.0,
            max_change_percent: 100.0,
            require_approval: false,
            oom_boost_default: 1.2,
            confidence_floor_samples: 10,
            significant_variation_cv: 0.3,
        },
        Profile::Custom => RecommendationKnobs {
            cpu_percentile: 90.0,
            mem_percentile: 90.0,
            safety_margin: 1.2,
            min_samples: 10,
            history_window_hours: 72,
            min_millicores: 10.0,
            max_millicores: 32_000.0,
            min_megabytes: 16.0,
            max_megabytes: 128_000.0,
            min_confidence: 0.0,
            max_change_percent: 100.0,
            require_approval: false,
            oom_boost_default: 1.2,
            confidence_floor_samples: 50,
            significant_variation_cv: 0.25,
        },
    }
}

/// Apply structured overrides on top of a profile's defaults; each `Some`
/// field wins, `None` inherits from the base.
pub fn apply_overrides(base: RecommendationKnobs, overrides: &ProfileOverrides) -> RecommendationKnobs {
    RecommendationKnobs {
        cpu_percentile: overrides.cpu_percentile.unwrap_or(base.cpu_percentile),
        mem_percentile: overrides.mem_percentile.unwrap_or(base.mem_percentile),
        safety_margin: overrides.safety_margin.unwrap_or(base.safety_margin),
        min_samples: overrides.min_samples.unwrap_or(base.min_samples),
        history_window_hours: overrides.history_window_hours.unwrap_or(base.history_window_hours),
        min_millicores: overrides.min_millicores.unwrap_or(base.min_millicores),
        max_millicores: overrides.max_millicores.unwrap_or(base.max_millicores),
        min_megabytes: overrides.min_megabytes.unwrap_or(base.min_megabytes),
        max_megabytes: overrides.max_megabytes.unwrap_or(base.max_megabytes),
        min_confidence: overrides.min_confidence.unwrap_or(base.min_confidence),
        max_change_percent: overrides.max_change_percent.unwrap_or(base.max_change_percent),
        require_approval: overrides.require_approval.unwrap_or(base.require_approval),
        oom_boost_default: overrides.oom_boost_default.unwrap_or(base.oom_boost_default),
        confidence_floor_samples: overrides.confidence_floor_samples.unwrap_or(base.confidence_floor_samples),
        significant_variation_cv: overrides.significant_variation_cv.unwrap_or(base.significant_variation_cv),
    }
}

/// Frozen, fully-resolved settings for one reconcile: the 15 knobs plus
/// the always-authoritative `dry_run` flag from the `Config` spec.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub knobs: RecommendationKnobs,
    pub dry_run: bool,
}

/// Resolve a `Config`'s profile chain: named-profile defaults →
/// `profile_overrides` → `dry_run` (always authoritative from the spec).
pub fn resolve(profile: Profile, overrides: Option<&ProfileOverrides>, dry_run: bool) -> ResolvedSettings {
    let base = profile_defaults(profile);
    let knobs = match overrides {
        Some(o) => apply_overrides(base, o),
        None => base,
    };
    ResolvedSettings { knobs, dry_run }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShouldApplyReason {
    DryRun,
    BelowConfidenceFloor,
    AboveMaxChange,
    RequiresApproval,
    Approved,
}

impl ShouldApplyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ShouldApplyReason::DryRun => "dry_run",
            ShouldApplyReason::BelowConfidenceFloor => "below_confidence_floor",
            ShouldApplyReason::AboveMaxChange => "above_max_change_ceiling",
            ShouldApplyReason::RequiresApproval => "requires_approval",
            ShouldApplyReason::Approved => "approved",
        }
    }
}

impl ResolvedSettings {
    /// Sequential predicate: dry-run → confidence floor → max-change
    /// ceiling → require-approval. The first failing/terminal check wins.
    pub fn should_apply(&self, confidence: f64, change_percent: f64) -> (bool, ShouldApplyReason) {
        if self.dry_run {
            return (false, ShouldApplyReason::DryRun);
        }
        if confidence < self.knobs.min_confidence {
            return (false, ShouldApplyReason::BelowConfidenceFloor);
        }
        if change_percent > self.knobs.max_change_percent {
            return (false, ShouldApplyReason::AboveMaxChange);
        }
        if self.knobs.require_approval {
            return (false, ShouldApplyReason::RequiresApproval);
        }
        (true, ShouldApplyReason::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_always_wins_even_with_good_confidence() {
        let settings = resolve(Profile::Development, None, true);
        let (apply, reason) = settings.should_apply(100.0, 1.0);
        assert!(!apply);
        assert_eq!(reason, ShouldApplyReason::DryRun);
    }

    #[test]
    fn overrides_win_over_profile_defaults() {
        let overrides = ProfileOverrides {
            min_confidence: Some(10.0),
            ..Default::default()
        };
        let settings = resolve(Profile::Production, Some(&overrides), false);
        assert_eq!(settings.knobs.min_confidence, 10.0);
        // Untouched fields still inherit from the production profile.
        assert_eq!(settings.knobs.require_approval, true);
    }

    #[test]
    fn should_apply_is_idempotent_for_same_inputs() {
        let settings = resolve(Profile::Staging, None, false);
        let first = settings.should_apply(80.0, 10.0);
        let second = settings.should_apply(80.0, 10.0);
        assert_eq!(first, second);
    }

    #[test]
    fn requires_approval_blocks_when_other_gates_pass() {
        let settings = resolve(Profile::Production, None, false);
        let (apply, reason) = settings.should_apply(90.0, 5.0);
        assert!(!apply);
        assert_eq!(reason, ShouldApplyReason::RequiresApproval);
    }
}
