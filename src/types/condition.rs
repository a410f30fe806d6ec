//! `ConditionSet`: a small owned collection enforcing the "one condition
//! per type, `lastTransitionTime` only advances on change" invariant from
//! the data-model spec, so the reconciler doesn't have to reimplement the
//! bookkeeping ad hoc.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{Condition, ConditionStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn get(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// Insert or update a condition of the given type. `lastTransitionTime`
    /// only advances when status actually changes (or on first insert);
    /// reason/message update in place without bumping the timestamp.
    pub fn set(
        &mut self,
        condition_type: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let condition_type = condition_type.into();
        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            let status_changed = existing.status != status;
            existing.reason = reason.into();
            existing.message = message.into();
            existing.status = status;
            if status_changed {
                existing.last_transition_time = now;
            }
        } else {
            self.conditions.push(Condition {
                condition_type,
                status,
                reason: reason.into(),
                message: message.into(),
                last_transition_time: now,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn dedups_by_type() {
        let mut set = ConditionSet::default();
        set.set("Ready", ConditionStatus::True, "Ok", "fine", t(0));
        set.set("Ready", ConditionStatus::True, "StillOk", "still fine", t(10));
        assert_eq!(set.conditions.len(), 1);
        assert_eq!(set.get("Ready").unwrap().reason, "StillOk");
    }

    #[test]
    fn preserves_transition_time_when_status_unchanged() {
        let mut set = ConditionSet::default();
        set.set("Ready", ConditionStatus::True, "Ok", "fine", t(0));
        set.set("Ready", ConditionStatus::True, "Ok2", "fine2", t(100));
        assert_eq!(set.get("Ready").unwrap().last_transition_time, t(0));
    }

    #[test]
    fn advances_transition_time_on_status_change() {
        let mut set = ConditionSet::default();
        set.set("Ready", ConditionStatus::True, "Ok", "fine", t(0));
        set.set("Ready", ConditionStatus::False, "Broken", "oops", t(100));
        assert_eq!(set.get("Ready").unwrap().last_transition_time, t(100));
    }
}
