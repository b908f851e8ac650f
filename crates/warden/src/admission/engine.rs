use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::controller::{run_pass, PassOutcome};
use super::domain::{
    AttributeReport, FacilityDraft, FacilityId, ScoreOverride, Subject, SubjectDraft, SubjectId,
    SubjectView, ValidationError,
};
use super::pool::{Facility, FacilityPool, FacilityView};
use super::snapshot::{FacilityRecord, Snapshot, SnapshotError, SubjectRecord};
use super::threshold::{effective_threshold, ThresholdMode};
use crate::config::EngineConfig;
use crate::history::AssignmentRecord;

/// Error raised by engine entry points. Every failure leaves subject and
/// facility state untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("subject '{0}' is not registered")]
    SubjectNotFound(SubjectId),
    #[error("facility '{0}' is not registered")]
    FacilityNotFound(FacilityId),
    #[error("subject '{0}' is already registered")]
    DuplicateSubject(SubjectId),
    #[error("facility '{0}' is already registered")]
    DuplicateFacility(FacilityId),
}

/// Effective admission cut-off reported to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSnapshot {
    pub value: f64,
    pub mode: ThresholdMode,
}

/// Aggregate counts consumed by the capacity monitor and reporting views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub subject_count: usize,
    pub facility_count: usize,
    pub aggregate_capacity: u32,
    pub aggregate_occupancy: usize,
}

/// The admission-control engine: owns the subject store, the facility pool,
/// and the assignment audit log.
///
/// Every mutating entry point re-scores the affected subjects and runs one
/// synchronous admission pass before returning, so callers always observe a
/// reconciled state. Callers share the engine behind [`SharedEngine`]; one
/// writer at a time keeps each pass a consistent snapshot.
#[derive(Debug)]
pub struct AdmissionEngine {
    subjects: Vec<Subject>,
    pool: FacilityPool,
    config: EngineConfig,
    history: Vec<AssignmentRecord>,
    fixed_today: Option<NaiveDate>,
}

/// Shared handle used by the HTTP layer and the capacity monitor.
pub type SharedEngine = Arc<RwLock<AdmissionEngine>>;

pub fn shared(engine: AdmissionEngine) -> SharedEngine {
    Arc::new(RwLock::new(engine))
}

impl AdmissionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            subjects: Vec::new(),
            pool: FacilityPool::new(),
            config,
            history: Vec::new(),
            fixed_today: None,
        }
    }

    /// Engine with a pinned evaluation date, for deterministic age brackets
    /// in tests and replays.
    pub fn with_today(config: EngineConfig, today: NaiveDate) -> Self {
        Self {
            fixed_today: Some(today),
            ..Self::new(config)
        }
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Local::now().date_naive())
    }

    // ---- mutation entry points -------------------------------------------

    /// Register a new subject; scores it, then runs an admission pass.
    pub fn register_subject(&mut self, draft: SubjectDraft) -> Result<SubjectView, EngineError> {
        let subject = Subject::from_draft(draft, self.today())?;
        if self.find_subject(subject.id()).is_some() {
            return Err(EngineError::DuplicateSubject(subject.id().clone()));
        }

        let id = subject.id().clone();
        info!(subject = %id, score = subject.priority(), "subject registered");
        self.subjects.push(subject);
        self.reconcile();
        self.subject(&id)
    }

    /// Remove a subject, releasing any held slot, then run a pass.
    pub fn remove_subject(&mut self, id: &SubjectId) -> Result<SubjectView, EngineError> {
        let index = self
            .subjects
            .iter()
            .position(|subject| subject.id() == id)
            .ok_or_else(|| EngineError::SubjectNotFound(id.clone()))?;

        self.release_slot(id);
        let mut removed = self.subjects.remove(index);
        removed.set_held(false);
        info!(subject = %id, "subject removed");
        self.reconcile();
        Ok(removed.view())
    }

    /// Amend one attribute through a controlled report; rescoring is
    /// immediate and an admission pass follows.
    pub fn report(
        &mut self,
        id: &SubjectId,
        report: AttributeReport,
    ) -> Result<SubjectView, EngineError> {
        let today = self.today();
        let subject = self
            .find_subject_mut(id)
            .ok_or_else(|| EngineError::SubjectNotFound(id.clone()))?;
        subject.apply_report(report, today)?;
        info!(subject = %id, score = subject.priority(), "attribute report applied");
        self.reconcile();
        self.subject(id)
    }

    pub fn add_facility(&mut self, draft: FacilityDraft) -> Result<FacilityView, EngineError> {
        let facility = Facility::from_draft(draft)?;
        if self.pool.get(facility.id()).is_some() {
            return Err(EngineError::DuplicateFacility(facility.id().clone()));
        }

        let id = facility.id().clone();
        info!(facility = %id, capacity = facility.capacity(), "facility added");
        self.pool.insert(facility);
        self.reconcile();
        self.facility(&id)
    }

    /// Remove a facility; its occupants return to the unassigned pool and a
    /// fresh pass may re-place them elsewhere.
    pub fn remove_facility(&mut self, id: &FacilityId) -> Result<(), EngineError> {
        let facility = self
            .pool
            .remove(id)
            .ok_or_else(|| EngineError::FacilityNotFound(id.clone()))?;

        for occupant in facility.occupants() {
            if let Some(subject) = self.find_subject_mut(occupant) {
                subject.set_held(false);
            }
            self.close_history(occupant);
        }
        info!(facility = %id, released = facility.occupancy(), "facility removed");
        self.reconcile();
        Ok(())
    }

    /// Change a facility's capacity. Shrinking releases the lowest-priority
    /// occupants back to the unassigned pool before the follow-up pass.
    pub fn set_facility_capacity(
        &mut self,
        id: &FacilityId,
        capacity: u32,
    ) -> Result<FacilityView, EngineError> {
        if capacity == 0 {
            return Err(ValidationError::ZeroCapacity.into());
        }
        if self.pool.get(id).is_none() {
            return Err(EngineError::FacilityNotFound(id.clone()));
        }

        let priorities = self.priorities();
        let displaced = self
            .pool
            .resize(id, capacity, &priorities)
            .ok_or_else(|| EngineError::FacilityNotFound(id.clone()))?;
        for subject_id in &displaced {
            if let Some(subject) = self.find_subject_mut(subject_id) {
                subject.set_held(false);
            }
            self.close_history(subject_id);
        }
        info!(facility = %id, capacity, displaced = displaced.len(), "facility capacity changed");
        self.reconcile();
        self.facility(id)
    }

    // ---- privileged overrides --------------------------------------------

    /// Pin a subject's score to the maximum and run a pass. Returns whether
    /// the subject ended up holding a slot.
    pub fn impose_urgent_hold(&mut self, id: &SubjectId) -> Result<bool, EngineError> {
        let subject = self
            .find_subject_mut(id)
            .ok_or_else(|| EngineError::SubjectNotFound(id.clone()))?;
        if subject.is_held() {
            return Ok(true);
        }
        subject.set_override(Some(ScoreOverride::Maximum));
        info!(subject = %id, "urgent hold imposed");
        self.reconcile();
        Ok(self.is_held(id)?)
    }

    /// Clear an urgent hold and release the slot it secured. The
    /// attribute-derived score becomes authoritative again and the subject
    /// must re-earn a slot in the follow-up pass.
    pub fn revoke_urgent_hold(&mut self, id: &SubjectId) -> Result<SubjectView, EngineError> {
        self.clear_override(id)?;
        if let Some(subject) = self.find_subject_mut(id) {
            subject.set_held(false);
        }
        self.release_slot(id);
        info!(subject = %id, "urgent hold revoked");
        self.reconcile();
        self.subject(id)
    }

    /// Release a held subject and pin its score to the minimum so the next
    /// passes leave it unassigned. Returns `false` when the subject was not
    /// holding a slot (a normal negative result, not an error).
    pub fn grant_release(&mut self, id: &SubjectId) -> Result<bool, EngineError> {
        let subject = self
            .find_subject_mut(id)
            .ok_or_else(|| EngineError::SubjectNotFound(id.clone()))?;
        if !subject.is_held() {
            return Ok(false);
        }

        subject.set_override(Some(ScoreOverride::Minimum));
        subject.set_held(false);
        self.release_slot(id);
        info!(subject = %id, "release granted");
        self.reconcile();
        Ok(true)
    }

    /// Revoke a granted release: recompute the real score and let the next
    /// pass decide whether the subject re-enters a facility.
    pub fn revoke_release(&mut self, id: &SubjectId) -> Result<SubjectView, EngineError> {
        self.clear_override(id)?;
        info!(subject = %id, "release revoked");
        self.reconcile();
        self.subject(id)
    }

    fn clear_override(&mut self, id: &SubjectId) -> Result<(), EngineError> {
        let today = self.today();
        let subject = self
            .find_subject_mut(id)
            .ok_or_else(|| EngineError::SubjectNotFound(id.clone()))?;
        subject.set_override(None);
        subject.recompute_score(today);
        Ok(())
    }

    // ---- query entry points ----------------------------------------------

    /// All subjects ranked by priority, descending; ties keep registration
    /// order.
    pub fn ranked_subjects(&self) -> Vec<SubjectView> {
        let mut views: Vec<SubjectView> = self.subjects.iter().map(Subject::view).collect();
        views.sort_by(|a, b| b.score.total_cmp(&a.score));
        views
    }

    pub fn subject(&self, id: &SubjectId) -> Result<SubjectView, EngineError> {
        self.find_subject(id)
            .map(Subject::view)
            .ok_or_else(|| EngineError::SubjectNotFound(id.clone()))
    }

    pub fn is_held(&self, id: &SubjectId) -> Result<bool, EngineError> {
        self.find_subject(id)
            .map(Subject::is_held)
            .ok_or_else(|| EngineError::SubjectNotFound(id.clone()))
    }

    pub fn facilities(&self) -> Vec<FacilityView> {
        self.pool.views()
    }

    pub fn facility(&self, id: &FacilityId) -> Result<FacilityView, EngineError> {
        self.pool
            .get(id)
            .map(Facility::view)
            .ok_or_else(|| EngineError::FacilityNotFound(id.clone()))
    }

    pub fn threshold(&self) -> ThresholdSnapshot {
        let priorities = self.priorities();
        let (value, mode) =
            effective_threshold(&self.pool, &priorities, self.config.static_threshold);
        ThresholdSnapshot { value, mode }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            subject_count: self.subjects.len(),
            facility_count: self.pool.len(),
            aggregate_capacity: self.pool.aggregate_capacity(),
            aggregate_occupancy: self.pool.aggregate_occupancy(),
        }
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    pub fn aggregate_capacity(&self) -> u32 {
        self.pool.aggregate_capacity()
    }

    pub fn history(&self) -> &[AssignmentRecord] {
        &self.history
    }

    // ---- snapshot load/save ----------------------------------------------

    /// Rebuild an engine from persisted state. Occupancy data is re-validated
    /// against the capacity invariants before being trusted; held flags are
    /// re-derived from the occupant lists, never read from the records.
    pub fn from_snapshot(config: EngineConfig, snapshot: Snapshot) -> Result<Self, SnapshotError> {
        Self::assemble(config, snapshot, None)
    }

    /// Snapshot load with a pinned evaluation date.
    pub fn from_snapshot_at(
        config: EngineConfig,
        snapshot: Snapshot,
        today: NaiveDate,
    ) -> Result<Self, SnapshotError> {
        Self::assemble(config, snapshot, Some(today))
    }

    fn assemble(
        config: EngineConfig,
        snapshot: Snapshot,
        fixed_today: Option<NaiveDate>,
    ) -> Result<Self, SnapshotError> {
        let mut engine = Self {
            fixed_today,
            ..Self::new(config)
        };
        let today = engine.today();

        let mut seen_subjects = HashSet::new();
        for record in snapshot.subjects {
            let (draft, score_override) = record.into_draft();
            let mut subject = Subject::from_draft(draft, today)?;
            if !seen_subjects.insert(subject.id().clone()) {
                return Err(SnapshotError::DuplicateSubject(subject.id().0.clone()));
            }
            subject.set_override(score_override);
            engine.subjects.push(subject);
        }

        let mut held = HashSet::new();
        let mut seen_facilities = HashSet::new();
        for record in snapshot.facilities {
            let FacilityRecord {
                id,
                name,
                capacity,
                occupants,
            } = record;
            let mut facility = Facility::from_draft(FacilityDraft { id, name, capacity })?;
            if !seen_facilities.insert(facility.id().clone()) {
                return Err(SnapshotError::DuplicateFacility(facility.id().0.clone()));
            }
            if occupants.len() > capacity as usize {
                return Err(SnapshotError::OverCapacity {
                    facility: facility.id().0.clone(),
                    occupants: occupants.len(),
                    capacity,
                });
            }
            for occupant in occupants {
                let subject_id = SubjectId(occupant);
                if !seen_subjects.contains(&subject_id) {
                    return Err(SnapshotError::UnknownOccupant {
                        facility: facility.id().0.clone(),
                        subject: subject_id.0,
                    });
                }
                if !held.insert(subject_id.clone()) {
                    return Err(SnapshotError::HeldTwice(subject_id.0));
                }
                let placed = facility.admit(subject_id);
                debug_assert!(placed);
            }
            engine.pool.insert(facility);
        }

        for subject in &mut engine.subjects {
            if held.contains(subject.id()) {
                subject.set_held(true);
            }
        }

        info!(
            subjects = engine.subjects.len(),
            facilities = engine.pool.len(),
            "engine state loaded from snapshot"
        );
        engine.reconcile();
        Ok(engine)
    }

    /// Read access for persistence collaborators; the inverse of
    /// [`AdmissionEngine::from_snapshot`].
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            subjects: self
                .subjects
                .iter()
                .map(|subject| {
                    let attributes = subject.attributes();
                    SubjectRecord {
                        id: subject.id().0.clone(),
                        name: subject.name().to_string(),
                        support_level: attributes.support_level,
                        impact_score: attributes.impact_score,
                        economic_percentile: attributes.economic_percentile,
                        birth_date: attributes.birth_date,
                        origin: attributes.origin,
                        elevated: attributes.elevated,
                        score_override: subject.score_override(),
                    }
                })
                .collect(),
            facilities: self
                .pool
                .iter()
                .map(|facility| FacilityRecord {
                    id: facility.id().0.clone(),
                    name: facility.name().to_string(),
                    capacity: facility.capacity(),
                    occupants: facility
                        .occupants()
                        .iter()
                        .map(|occupant| occupant.0.clone())
                        .collect(),
                })
                .collect(),
        }
    }

    // ---- internals ---------------------------------------------------------

    fn find_subject(&self, id: &SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.id() == id)
    }

    fn find_subject_mut(&mut self, id: &SubjectId) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|subject| subject.id() == id)
    }

    fn priorities(&self) -> HashMap<SubjectId, f64> {
        self.subjects
            .iter()
            .map(|subject| (subject.id().clone(), subject.priority()))
            .collect()
    }

    /// Evict the subject from whichever facility holds it, closing the open
    /// audit record. No-op when the subject holds no slot.
    fn release_slot(&mut self, id: &SubjectId) {
        let facility_id = self
            .pool
            .facility_holding(id)
            .map(|facility| facility.id().clone());
        if let Some(facility_id) = facility_id {
            if let Some(facility) = self.pool.get_mut(&facility_id) {
                facility.evict(id);
            }
            self.close_history(id);
        }
    }

    /// One full reconciliation pass. Scores are refreshed first so the pass
    /// never ranks on stale age brackets.
    fn reconcile(&mut self) -> PassOutcome {
        let today = self.today();
        for subject in &mut self.subjects {
            subject.recompute_score(today);
        }

        let outcome = run_pass(
            &mut self.subjects,
            &mut self.pool,
            self.config.static_threshold,
        );

        let now = Utc::now();
        for (subject_id, _) in &outcome.evicted {
            self.close_history(subject_id);
        }
        for (subject_id, facility_id) in &outcome.admitted {
            self.history.push(AssignmentRecord {
                subject_id: subject_id.clone(),
                facility_id: facility_id.clone(),
                admitted_at: now,
                released_at: None,
            });
        }

        if !outcome.is_noop() {
            info!(
                admitted = outcome.admitted.len(),
                evicted = outcome.evicted.len(),
                threshold = outcome.threshold,
                mode = ?outcome.mode,
                "admission pass reconciled"
            );
        }
        outcome
    }

    fn close_history(&mut self, subject_id: &SubjectId) {
        if let Some(record) = self
            .history
            .iter_mut()
            .rev()
            .find(|record| record.is_open() && &record.subject_id == subject_id)
        {
            record.released_at = Some(Utc::now());
        }
    }
}
