use std::collections::HashMap;

use tracing::debug;

use super::domain::{FacilityId, Subject, SubjectId};
use super::pool::FacilityPool;
use super::threshold::{effective_threshold, ThresholdMode};

/// Result of one reconciliation pass over the subject list.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    pub threshold: f64,
    pub mode: ThresholdMode,
    pub admitted: Vec<(SubjectId, FacilityId)>,
    pub evicted: Vec<(SubjectId, FacilityId)>,
}

impl PassOutcome {
    pub fn is_noop(&self) -> bool {
        self.admitted.is_empty() && self.evicted.is_empty()
    }
}

/// Run one admission pass: rank all subjects, admit everyone at or above the
/// effective threshold into spare capacity, and preempt strictly weaker
/// occupants once the pool is saturated.
///
/// The threshold is computed exactly once. The early exit below relies on the
/// scan seeing a single, fixed cut-off; recomputing the dynamic threshold
/// inside the loop would make it unsound.
pub(crate) fn run_pass(
    subjects: &mut [Subject],
    pool: &mut FacilityPool,
    static_threshold: f64,
) -> PassOutcome {
    let priorities: HashMap<SubjectId, f64> = subjects
        .iter()
        .map(|subject| (subject.id().clone(), subject.priority()))
        .collect();
    let (threshold, mode) = effective_threshold(pool, &priorities, static_threshold);

    debug!(
        threshold,
        ?mode,
        subjects = subjects.len(),
        facilities = pool.len(),
        aggregate_capacity = pool.aggregate_capacity(),
        "running admission pass"
    );

    // Stable sort over the insertion-ordered store: equal scores keep their
    // original registration order.
    let mut order: Vec<usize> = (0..subjects.len()).collect();
    order.sort_by(|&a, &b| subjects[b].priority().total_cmp(&subjects[a].priority()));

    let mut admitted = Vec::new();
    let mut evicted = Vec::new();

    for index in order {
        if subjects[index].is_held() {
            continue;
        }

        let score = subjects[index].priority();
        if score < threshold {
            // Everything after this candidate ranks at or below it; with a
            // fixed threshold none of them can qualify either.
            break;
        }

        let candidate = subjects[index].id().clone();

        if let Some(facility) = pool.least_loaded_mut() {
            if facility.has_space() {
                let facility_id = facility.id().clone();
                let placed = facility.admit(candidate.clone());
                debug_assert!(placed);
                subjects[index].set_held(true);
                admitted.push((candidate, facility_id));
                continue;
            }
        } else {
            // No facilities registered; nothing later in the scan can land
            // either, but the early-exit rule is score-based, so keep the
            // loop shape and let each candidate fail the same way.
            continue;
        }

        // Saturated: preempt only the globally weakest occupant, and only for
        // a strictly higher-priority candidate. Failure is not fatal to the
        // pass; weaker candidates may still displace someone even weaker.
        let Some((facility_id, weakest, weakest_score)) =
            pool.lowest_priority_occupant(&priorities)
        else {
            continue;
        };
        if score <= weakest_score {
            continue;
        }

        let Some(facility) = pool.get_mut(&facility_id) else {
            continue;
        };
        facility.evict(&weakest);
        let placed = facility.admit(candidate.clone());
        debug_assert!(placed);

        if let Some(displaced) = subjects.iter_mut().find(|subject| subject.id() == &weakest) {
            displaced.set_held(false);
        }
        subjects[index].set_held(true);
        evicted.push((weakest, facility_id.clone()));
        admitted.push((candidate, facility_id));
    }

    // The scan assumed the cut-off stayed fixed. A preemption only ever swaps
    // a weaker occupant for a stronger one, so the dynamic threshold can only
    // rise over the pass; verify that in debug builds.
    if mode == ThresholdMode::Dynamic {
        let end_priorities: HashMap<SubjectId, f64> = subjects
            .iter()
            .map(|subject| (subject.id().clone(), subject.priority()))
            .collect();
        let (end_threshold, _) = effective_threshold(pool, &end_priorities, static_threshold);
        debug_assert!(
            end_threshold >= threshold,
            "dynamic threshold regressed across a pass: {end_threshold} < {threshold}"
        );
    }

    PassOutcome {
        threshold,
        mode,
        admitted,
        evicted,
    }
}
