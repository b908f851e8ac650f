//! Shared fixtures for the admission unit tests.

use chrono::NaiveDate;

use crate::admission::domain::{FacilityDraft, Origin, Subject, SubjectAttributes, SubjectDraft};
use crate::admission::engine::AdmissionEngine;
use crate::admission::pool::{Facility, FacilityPool};
use crate::config::EngineConfig;

/// Fixed evaluation date so age brackets are deterministic.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

/// Birth date producing exactly `age` whole years on [`today`].
pub fn birth_date(age: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025 - age as i32, 6, 1).unwrap()
}

pub fn attributes(
    support_level: i8,
    impact_score: u8,
    economic_percentile: u8,
    age: u32,
    origin: Origin,
    elevated: bool,
) -> SubjectAttributes {
    SubjectAttributes {
        support_level,
        impact_score,
        economic_percentile,
        birth_date: birth_date(age),
        origin,
        elevated,
    }
}

/// Draft scoring exactly 500 on [`today`]: sits right on the default static
/// threshold.
pub fn baseline_draft(id: &str) -> SubjectDraft {
    SubjectDraft {
        id: id.to_string(),
        name: format!("subject {id}"),
        support_level: 0,
        impact_score: 5,
        economic_percentile: 5,
        birth_date: birth_date(30),
        origin: Origin::A,
        elevated: false,
    }
}

/// Draft whose age falls outside every bracket, so the score is exactly
/// `score` (a multiple of 20 between 40 and 620). The multiplier-free shape
/// keeps relative ordering in tests obvious.
pub fn scored_draft(id: &str, score: u32) -> SubjectDraft {
    assert_eq!(score % 20, 0, "score must be a multiple of 20");
    let mut units = score / 20;
    assert!((2..=31).contains(&units), "score {score} is out of reach");

    let economic_percentile = units.saturating_sub(21).clamp(1, 10);
    units -= economic_percentile;
    let impact_score = units.saturating_sub(11).clamp(1, 10);
    units -= impact_score;
    let support_level = 10 - units as i8;

    SubjectDraft {
        id: id.to_string(),
        name: format!("subject {id}"),
        support_level,
        impact_score: impact_score as u8,
        economic_percentile: economic_percentile as u8,
        birth_date: birth_date(80),
        origin: Origin::A,
        elevated: false,
    }
}

/// Same as [`scored_draft`] but with the elevated multiplier applied, so the
/// final score is `score * 1.25`.
pub fn elevated_draft(id: &str, base_score: u32) -> SubjectDraft {
    SubjectDraft {
        elevated: true,
        ..scored_draft(id, base_score)
    }
}

pub fn subject(draft: SubjectDraft) -> Subject {
    Subject::from_draft(draft, today()).unwrap()
}

pub fn facility_draft(id: &str, capacity: u32) -> FacilityDraft {
    FacilityDraft {
        id: id.to_string(),
        name: format!("facility {id}"),
        capacity,
    }
}

pub fn pool(facilities: &[(&str, u32)]) -> FacilityPool {
    let mut pool = FacilityPool::new();
    for (id, capacity) in facilities {
        pool.insert(Facility::from_draft(facility_draft(id, *capacity)).unwrap());
    }
    pool
}

/// Engine pinned to [`today`] with the default static threshold of 500.
pub fn engine() -> AdmissionEngine {
    AdmissionEngine::with_today(EngineConfig::default(), today())
}

pub fn engine_with_threshold(static_threshold: f64) -> AdmissionEngine {
    AdmissionEngine::with_today(EngineConfig { static_threshold }, today())
}
