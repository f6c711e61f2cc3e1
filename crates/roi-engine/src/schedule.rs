//! Rollout schedule: fixed pilot milestones projected from a kickoff
//! date.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Milestone names, day offsets from kickoff, and blurbs, in rollout
/// order.
const MILESTONES: [(&str, i64, &str); 7] = [
    ("Kickoff & targeting", 0, "Confirm target pools and list criteria."),
    ("Design final", 4, "Finalize the unit creative."),
    ("Sampling", 9, "Approve a sample before production."),
    ("Production", 18, "Manufacture the pilot batch."),
    ("Shipping", 32, "Deliver to the target audience."),
    ("Rollout", 40, "Staggered delivery for measurement."),
    ("First review", 60, "Review evidence against projections."),
];

/// A named rollout step with its scheduled date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Step name shown on the plan.
    pub name: String,
    /// Scheduled calendar date.
    pub date: NaiveDate,
    /// One-line description of the step.
    pub description: String,
}

/// Compute the rollout schedule for a pilot kicking off at `start`.
///
/// The engine never reads the clock; the kickoff date is an input, so the
/// same date always yields the same schedule.
pub fn deployment_schedule(start: NaiveDate) -> Vec<Milestone> {
    MILESTONES
        .iter()
        .map(|(name, offset, description)| Milestone {
            name: (*name).to_string(),
            date: start + Duration::days(*offset),
            description: (*description).to_string(),
        })
        .collect()
}
