//! Ephemeral Pareto-candidate types shared between `pareto` and `recommend`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Objective {
    Cost,
    Performance,
    Reliability,
    Efficiency,
    Stability,
}

impl Objective {
    pub const ALL: [Objective; 5] = [
        Objective::Cost,
        Objective::Performance,
        Objective::Reliability,
        Objective::Efficiency,
        Objective::Stability,
    ];

    /// Whether lower raw values are better for this objective.
    pub fn minimize(self) -> bool {
        matches!(self, Objective::Cost)
    }

    pub fn default_weight(self) -> f64 {
        match self {
            Objective::Cost => 1.0,
            Objective::Performance => 1.0,
            Objective::Reliability => 1.0,
            Objective::Efficiency => 1.0,
            Objective::Stability => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveScore {
    pub value: f64,
    pub weight: f64,
    pub minimize: bool,
    pub normalized: f64,
}

/// A single candidate sizing under evaluation by the Pareto optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub id: String,
    pub label: String,
    pub cpu_request_millicores: f64,
    pub mem_request_bytes: f64,
    pub cpu_limit_millicores: f64,
    pub mem_limit_bytes: f64,
    pub objectives: HashMap<Objective, ObjectiveScore>,
    pub dominated_by: Vec<String>,
    pub dominates: Vec<String>,
    pub pareto_rank: usize,
    pub crowding_distance: f64,
    pub overall_score: f64,
}

impl Solution {
    /// `self` dominates `other` iff it is no worse on every objective and
    /// strictly better on at least one, after minimize/maximize polarity
    /// is folded into `ObjectiveScore::normalized` (already oriented so
    /// that higher-normalized is always better).
    pub fn dominates(&self, other: &Solution) -> bool {
        let mut strictly_better_once = false;
        for objective in Objective::ALL {
            let (Some(a), Some(b)) = (self.objectives.get(&objective), other.objectives.get(&objective))
            else {
                continue;
            };
            if a.normalized < b.normalized - f64::EPSILON {
                return false;
            }
            if a.normalized > b.normalized + f64::EPSILON {
                strictly_better_once = true;
            }
        }
        strictly_better_once
    }
}
