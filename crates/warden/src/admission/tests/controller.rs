use std::collections::HashMap;

use crate::admission::controller::run_pass;
use crate::admission::domain::{FacilityId, Subject, SubjectId};
use crate::admission::threshold::{effective_threshold, ThresholdMode};

use super::common::{baseline_draft, elevated_draft, pool, scored_draft, subject};

fn sid(id: &str) -> SubjectId {
    SubjectId(id.to_string())
}

fn fid(id: &str) -> FacilityId {
    FacilityId(id.to_string())
}

fn priorities(subjects: &[Subject]) -> HashMap<SubjectId, f64> {
    subjects
        .iter()
        .map(|subject| (subject.id().clone(), subject.priority()))
        .collect()
}

#[test]
fn admits_only_at_or_above_the_static_threshold() {
    let mut subjects = vec![
        subject(scored_draft("100", 600)),
        subject(scored_draft("101", 400)),
        subject(baseline_draft("102")),
    ];
    let mut pool = pool(&[("f1", 3)]);

    let outcome = run_pass(&mut subjects, &mut pool, 500.0);
    assert_eq!(outcome.mode, ThresholdMode::Static);
    assert_eq!(outcome.threshold, 500.0);

    // 600 and the exact-threshold 500 get in; 400 stays out despite the
    // spare slot.
    assert!(subjects[0].is_held());
    assert!(!subjects[1].is_held());
    assert!(subjects[2].is_held());
    assert_eq!(outcome.admitted.len(), 2);
    assert!(outcome.evicted.is_empty());
}

#[test]
fn new_slots_fill_the_least_loaded_facility_first() {
    let mut subjects = vec![
        subject(scored_draft("100", 620)),
        subject(scored_draft("101", 600)),
    ];
    let mut pool = pool(&[("f1", 2), ("f2", 4)]);

    run_pass(&mut subjects, &mut pool, 500.0);

    // Both start empty, so the ratio tie keeps f1 for the first admit. The
    // second candidate then sees f1 at 1/2 against f2 at 0/4 and takes f2.
    assert!(pool.get(&fid("f1")).unwrap().holds(&sid("100")));
    assert!(pool.get(&fid("f2")).unwrap().holds(&sid("101")));
}

#[test]
fn saturation_preempts_only_the_globally_weakest_occupant() {
    let mut subjects = vec![
        subject(scored_draft("100", 200)),
        subject(scored_draft("101", 300)),
    ];
    let mut pool = pool(&[("f1", 1), ("f2", 1)]);
    run_pass(&mut subjects, &mut pool, 100.0);
    assert!(subjects.iter().all(Subject::is_held));

    // A mid-strength candidate arrives into a saturated pool.
    subjects.push(subject(elevated_draft("102", 200))); // scores 250

    let outcome = run_pass(&mut subjects, &mut pool, 100.0);
    assert_eq!(outcome.mode, ThresholdMode::Dynamic);
    assert_eq!(outcome.threshold, 200.0);
    assert_eq!(outcome.evicted.len(), 1);
    assert_eq!(outcome.evicted[0].0, sid("100"));

    assert!(!subjects[0].is_held());
    assert!(subjects[1].is_held());
    assert!(subjects[2].is_held());
}

#[test]
fn equal_scores_never_preempt() {
    let mut subjects = vec![subject(scored_draft("100", 300))];
    let mut pool = pool(&[("f1", 1)]);
    run_pass(&mut subjects, &mut pool, 100.0);
    assert!(subjects[0].is_held());

    subjects.push(subject(scored_draft("101", 300)));
    let outcome = run_pass(&mut subjects, &mut pool, 100.0);

    assert!(outcome.is_noop());
    assert!(subjects[0].is_held());
    assert!(!subjects[1].is_held());
}

#[test]
fn a_second_pass_over_settled_state_is_a_noop() {
    let mut subjects = vec![
        subject(scored_draft("100", 620)),
        subject(scored_draft("101", 540)),
        subject(scored_draft("102", 360)),
    ];
    let mut pool = pool(&[("f1", 1), ("f2", 1)]);

    let first = run_pass(&mut subjects, &mut pool, 500.0);
    assert_eq!(first.admitted.len(), 2);

    let held_before: Vec<bool> = subjects.iter().map(Subject::is_held).collect();
    let second = run_pass(&mut subjects, &mut pool, 500.0);
    assert!(second.is_noop());
    let held_after: Vec<bool> = subjects.iter().map(Subject::is_held).collect();
    assert_eq!(held_before, held_after);
}

#[test]
fn held_subjects_are_skipped_and_keep_their_slot() {
    let mut subjects = vec![
        subject(scored_draft("100", 540)),
        subject(scored_draft("101", 620)),
    ];
    let mut pool = pool(&[("f1", 1), ("f2", 1)]);
    run_pass(&mut subjects, &mut pool, 500.0);

    let holder_of_100 = pool.facility_holding(&sid("100")).unwrap().id().clone();
    run_pass(&mut subjects, &mut pool, 500.0);
    assert_eq!(
        pool.facility_holding(&sid("100")).unwrap().id(),
        &holder_of_100
    );
}

#[test]
fn dynamic_threshold_never_regresses_across_a_pass() {
    let mut subjects = vec![
        subject(scored_draft("100", 200)),
        subject(scored_draft("101", 300)),
    ];
    let mut pool = pool(&[("f1", 1), ("f2", 1)]);
    run_pass(&mut subjects, &mut pool, 100.0);

    subjects.push(subject(elevated_draft("102", 200))); // 250
    subjects.push(subject(scored_draft("103", 400)));

    let outcome = run_pass(&mut subjects, &mut pool, 100.0);
    assert_eq!(outcome.threshold, 200.0);

    // 400 displaced the 200 occupant; 250 then faced a floor of 300 and
    // stayed out. The effective threshold only moved up.
    let (end_threshold, mode) = effective_threshold(&pool, &priorities(&subjects), 100.0);
    assert_eq!(mode, ThresholdMode::Dynamic);
    assert!(end_threshold >= outcome.threshold);
    assert_eq!(end_threshold, 300.0);
    assert!(!subjects[2].is_held());
    assert!(subjects[3].is_held());
}

#[test]
fn a_pass_with_no_facilities_changes_nothing() {
    let mut subjects = vec![subject(scored_draft("100", 620))];
    let mut pool = pool(&[]);

    let outcome = run_pass(&mut subjects, &mut pool, 500.0);
    assert!(outcome.is_noop());
    assert!(!subjects[0].is_held());
}
