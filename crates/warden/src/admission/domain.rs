use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::scoring::{self, SCORE_CEILING, SCORE_FLOOR};

/// Identifier wrapper for subjects competing for facility slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for facilities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacilityId(pub String);

impl std::fmt::Display for FacilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Origin categories carrying distinct scoring weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    A,
    B,
    C,
}

impl Origin {
    pub const fn label(self) -> &'static str {
        match self {
            Origin::A => "A",
            Origin::B => "B",
            Origin::C => "C",
        }
    }
}

/// Weighted attributes a subject is scored on.
///
/// Ranges are enforced at construction and on every amendment, so a stored
/// subject never carries out-of-range inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectAttributes {
    pub support_level: i8,
    pub impact_score: u8,
    pub economic_percentile: u8,
    pub birth_date: NaiveDate,
    pub origin: Origin,
    pub elevated: bool,
}

impl SubjectAttributes {
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        if !(-1..=10).contains(&self.support_level) {
            return Err(ValidationError::SupportLevelOutOfRange(self.support_level));
        }
        if !(1..=10).contains(&self.impact_score) {
            return Err(ValidationError::ImpactScoreOutOfRange(self.impact_score));
        }
        if !(1..=10).contains(&self.economic_percentile) {
            return Err(ValidationError::EconomicPercentileOutOfRange(
                self.economic_percentile,
            ));
        }
        if self.birth_date > today {
            return Err(ValidationError::BirthDateInFuture(self.birth_date));
        }
        Ok(())
    }

    /// Whole years elapsed between the birth date and the evaluation date.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        today.years_since(self.birth_date).unwrap_or(0)
    }
}

/// Controlled amendment to a single scored attribute.
///
/// Each accepted report immediately re-triggers scoring, so a subject's
/// priority is never stale relative to its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeReport {
    SupportLevel(i8),
    ImpactScore(u8),
    EconomicPercentile(u8),
    Origin(Origin),
    ElevatedStatus(bool),
}

/// Privileged pin applied over the computed score.
///
/// Cleared by the next attribute report, which restores attribute-derived
/// scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOverride {
    Maximum,
    Minimum,
}

impl ScoreOverride {
    pub fn value(self) -> f64 {
        match self {
            ScoreOverride::Maximum => SCORE_CEILING,
            ScoreOverride::Minimum => SCORE_FLOOR,
        }
    }
}

/// Unvalidated registration payload for a new subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectDraft {
    pub id: String,
    pub name: String,
    pub support_level: i8,
    pub impact_score: u8,
    pub economic_percentile: u8,
    pub birth_date: NaiveDate,
    pub origin: Origin,
    pub elevated: bool,
}

/// A registered subject with its current priority score and held flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    id: SubjectId,
    name: String,
    attributes: SubjectAttributes,
    score: f64,
    score_override: Option<ScoreOverride>,
    held: bool,
}

impl Subject {
    pub fn from_draft(draft: SubjectDraft, today: NaiveDate) -> Result<Self, ValidationError> {
        if draft.id.is_empty() || !draft.id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidSubjectId(draft.id));
        }
        if draft.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let attributes = SubjectAttributes {
            support_level: draft.support_level,
            impact_score: draft.impact_score,
            economic_percentile: draft.economic_percentile,
            birth_date: draft.birth_date,
            origin: draft.origin,
            elevated: draft.elevated,
        };
        attributes.validate(today)?;

        let score = scoring::priority_score(&attributes, today);
        Ok(Self {
            id: SubjectId(draft.id),
            name: draft.name,
            attributes,
            score,
            score_override: None,
            held: false,
        })
    }

    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &SubjectAttributes {
        &self.attributes
    }

    /// Effective priority: a privileged override wins over the computed score.
    pub fn priority(&self) -> f64 {
        match self.score_override {
            Some(pin) => pin.value(),
            None => self.score,
        }
    }

    pub fn computed_score(&self) -> f64 {
        self.score
    }

    pub fn score_override(&self) -> Option<ScoreOverride> {
        self.score_override
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub(crate) fn set_held(&mut self, held: bool) {
        self.held = held;
    }

    pub(crate) fn set_override(&mut self, pin: Option<ScoreOverride>) {
        self.score_override = pin;
    }

    pub(crate) fn recompute_score(&mut self, today: NaiveDate) {
        self.score = scoring::priority_score(&self.attributes, today);
    }

    /// Apply a validated attribute amendment and rescore synchronously.
    ///
    /// Clears any privileged override: once fresh attribute data arrives the
    /// computed score is authoritative again.
    pub(crate) fn apply_report(
        &mut self,
        report: AttributeReport,
        today: NaiveDate,
    ) -> Result<(), ValidationError> {
        let mut amended = self.attributes;
        match report {
            AttributeReport::SupportLevel(level) => amended.support_level = level,
            AttributeReport::ImpactScore(score) => amended.impact_score = score,
            AttributeReport::EconomicPercentile(percentile) => {
                amended.economic_percentile = percentile
            }
            AttributeReport::Origin(origin) => amended.origin = origin,
            AttributeReport::ElevatedStatus(elevated) => amended.elevated = elevated,
        }
        amended.validate(today)?;

        self.attributes = amended;
        self.score_override = None;
        self.recompute_score(today);
        Ok(())
    }

    /// Serializable snapshot of the subject for API responses and reports.
    pub fn view(&self) -> SubjectView {
        SubjectView {
            id: self.id.clone(),
            name: self.name.clone(),
            score: self.priority(),
            held: self.held,
            origin: self.attributes.origin,
            elevated: self.attributes.elevated,
            overridden: self.score_override.is_some(),
        }
    }
}

/// Sanitized subject representation exposed to collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectView {
    pub id: SubjectId,
    pub name: String,
    pub score: f64,
    pub held: bool,
    pub origin: Origin,
    pub elevated: bool,
    pub overridden: bool,
}

/// Unvalidated registration payload for a new facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityDraft {
    pub id: String,
    pub name: String,
    pub capacity: u32,
}

/// Domain-range violation rejected at the boundary; state is left unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("subject id '{0}' must be a non-empty string of digits")]
    InvalidSubjectId(String),
    #[error("name cannot be empty")]
    EmptyName,
    #[error("facility id cannot be empty")]
    EmptyFacilityId,
    #[error("support level {0} outside [-1, 10]")]
    SupportLevelOutOfRange(i8),
    #[error("impact score {0} outside [1, 10]")]
    ImpactScoreOutOfRange(u8),
    #[error("economic percentile {0} outside [1, 10]")]
    EconomicPercentileOutOfRange(u8),
    #[error("birth date {0} is in the future")]
    BirthDateInFuture(NaiveDate),
    #[error("facility capacity must be at least 1")]
    ZeroCapacity,
}
