//! Priority-based admission control.
//!
//! Subjects are scored on their weighted attributes, ranked, and admitted
//! into capacity-limited facilities; once the pool saturates, candidates can
//! only enter by preempting a strictly weaker occupant. Every mutating entry
//! point runs one synchronous reconciliation pass, so capacity bounds and the
//! admission threshold hold at every observable point.

mod controller;
pub mod domain;
pub mod engine;
pub mod pool;
mod router;
pub mod scoring;
pub mod snapshot;
pub mod threshold;

#[cfg(test)]
mod tests;

pub use controller::PassOutcome;
pub use domain::{
    AttributeReport, FacilityDraft, FacilityId, Origin, ScoreOverride, Subject, SubjectAttributes,
    SubjectDraft, SubjectId, SubjectView, ValidationError,
};
pub use engine::{shared, AdmissionEngine, EngineError, EngineStats, SharedEngine, ThresholdSnapshot};
pub use pool::{Facility, FacilityPool, FacilityView};
pub use router::{admission_router, ROLE_HEADER};
pub use scoring::{
    priority_score, score_breakdown, ScoreComponent, ScoreFactor, SCORE_CEILING, SCORE_FLOOR,
};
pub use snapshot::{FacilityRecord, Snapshot, SnapshotError, SubjectRecord};
pub use threshold::{effective_threshold, ThresholdMode};
