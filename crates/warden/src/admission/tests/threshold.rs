use std::collections::HashMap;

use crate::admission::domain::SubjectId;
use crate::admission::pool::FacilityPool;
use crate::admission::threshold::{effective_threshold, ThresholdMode};

use super::common::pool;

fn priorities(entries: &[(&str, f64)]) -> HashMap<SubjectId, f64> {
    entries
        .iter()
        .map(|(id, score)| (SubjectId((*id).to_string()), *score))
        .collect()
}

fn occupy(pool: &mut FacilityPool, facility: &str, subject: &str) {
    let facility = pool
        .get_mut(&crate::admission::domain::FacilityId(facility.to_string()))
        .unwrap();
    assert!(facility.admit(SubjectId(subject.to_string())));
}

#[test]
fn static_threshold_while_capacity_remains() {
    let mut pool = pool(&[("f1", 2)]);
    occupy(&mut pool, "f1", "100");

    let priorities = priorities(&[("100", 640.0)]);
    let (value, mode) = effective_threshold(&pool, &priorities, 500.0);
    assert_eq!(value, 500.0);
    assert_eq!(mode, ThresholdMode::Static);
}

#[test]
fn weakest_occupant_sets_the_bar_once_saturated() {
    let mut pool = pool(&[("f1", 1), ("f2", 1)]);
    occupy(&mut pool, "f1", "100");
    occupy(&mut pool, "f2", "101");

    let priorities = priorities(&[("100", 640.0), ("101", 320.0)]);
    let (value, mode) = effective_threshold(&pool, &priorities, 500.0);
    assert_eq!(value, 320.0);
    assert_eq!(mode, ThresholdMode::Dynamic);
}

#[test]
fn one_open_slot_anywhere_keeps_the_static_threshold() {
    let mut pool = pool(&[("f1", 1), ("f2", 2)]);
    occupy(&mut pool, "f1", "100");
    occupy(&mut pool, "f2", "101");

    let priorities = priorities(&[("100", 640.0), ("101", 320.0)]);
    let (value, mode) = effective_threshold(&pool, &priorities, 500.0);
    assert_eq!(value, 500.0);
    assert_eq!(mode, ThresholdMode::Static);
}

#[test]
fn empty_pool_falls_back_to_the_static_value() {
    let pool = FacilityPool::new();
    let (value, mode) = effective_threshold(&pool, &HashMap::new(), 500.0);
    assert_eq!(value, 500.0);
    assert_eq!(mode, ThresholdMode::Static);
}
