use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::domain::SubjectId;
use super::pool::FacilityPool;

/// Which rule produced the effective threshold for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Fixed configuration value; applies while any facility has free capacity.
    Static,
    /// The weakest current occupant sets the bar; applies only when every
    /// facility is simultaneously full.
    Dynamic,
}

/// Compute the admission cut-off for the current pool state.
///
/// When all facilities are full the minimum held priority becomes the
/// threshold, so a candidate must be able to displace someone to get in. An
/// empty pool (or a saturated pool with no occupants, which only happens when
/// there are no facilities at all) falls back to the static value.
pub fn effective_threshold(
    pool: &FacilityPool,
    priorities: &HashMap<SubjectId, f64>,
    static_threshold: f64,
) -> (f64, ThresholdMode) {
    if !pool.all_full() || pool.is_empty() {
        return (static_threshold, ThresholdMode::Static);
    }

    match pool.lowest_priority_occupant(priorities) {
        Some((_, _, weakest)) => (weakest, ThresholdMode::Dynamic),
        None => (static_threshold, ThresholdMode::Static),
    }
}
