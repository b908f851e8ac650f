use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Origin, ScoreOverride, SubjectDraft, ValidationError};

/// Fully-constructed engine state accepted at startup and exposed back to
/// persistence collaborators. The on-disk format is a collaborator concern;
/// these types only fix the shape the core re-validates before trusting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub subjects: Vec<SubjectRecord>,
    pub facilities: Vec<FacilityRecord>,
}

/// Persisted subject attributes. Scores are never persisted: they are
/// recomputed from attributes on load so a stale stored value cannot leak in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: String,
    pub name: String,
    pub support_level: i8,
    pub impact_score: u8,
    pub economic_percentile: u8,
    pub birth_date: NaiveDate,
    pub origin: Origin,
    pub elevated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_override: Option<ScoreOverride>,
}

impl SubjectRecord {
    pub(crate) fn into_draft(self) -> (SubjectDraft, Option<ScoreOverride>) {
        let SubjectRecord {
            id,
            name,
            support_level,
            impact_score,
            economic_percentile,
            birth_date,
            origin,
            elevated,
            score_override,
        } = self;
        (
            SubjectDraft {
                id,
                name,
                support_level,
                impact_score,
                economic_percentile,
                birth_date,
                origin,
                elevated,
            },
            score_override,
        )
    }
}

/// Persisted facility shape with occupant references resolved by subject id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub occupants: Vec<String>,
}

/// Snapshot rejected during load re-validation. Loaded occupancy data is
/// never trusted until every reference resolves and every capacity bound
/// holds.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("duplicate subject id '{0}' in snapshot")]
    DuplicateSubject(String),
    #[error("duplicate facility id '{0}' in snapshot")]
    DuplicateFacility(String),
    #[error("facility '{facility}' references unknown subject '{subject}'")]
    UnknownOccupant { facility: String, subject: String },
    #[error("subject '{0}' is held by more than one facility")]
    HeldTwice(String),
    #[error("facility '{facility}' holds {occupants} subjects but has capacity {capacity}")]
    OverCapacity {
        facility: String,
        occupants: usize,
        capacity: u32,
    },
}
