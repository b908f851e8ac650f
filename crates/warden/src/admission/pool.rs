use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{FacilityDraft, FacilityId, SubjectId, ValidationError};

/// A capacity-bounded resource holding the subjects currently admitted to it.
///
/// The occupant list never exceeds `capacity` at any observable point; every
/// mutation path re-checks the bound before committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facility {
    id: FacilityId,
    name: String,
    capacity: u32,
    occupants: Vec<SubjectId>,
}

impl Facility {
    pub fn from_draft(draft: FacilityDraft) -> Result<Self, ValidationError> {
        if draft.id.trim().is_empty() {
            return Err(ValidationError::EmptyFacilityId);
        }
        if draft.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if draft.capacity == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        Ok(Self {
            id: FacilityId(draft.id),
            name: draft.name,
            capacity: draft.capacity,
            occupants: Vec::new(),
        })
    }

    pub fn id(&self) -> &FacilityId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn occupants(&self) -> &[SubjectId] {
        &self.occupants
    }

    pub fn occupancy(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.capacity as usize
    }

    pub fn has_space(&self) -> bool {
        !self.is_full()
    }

    /// Fraction of capacity currently in use, in [0, 1].
    pub fn occupancy_ratio(&self) -> f64 {
        self.occupants.len() as f64 / f64::from(self.capacity)
    }

    pub fn holds(&self, subject: &SubjectId) -> bool {
        self.occupants.contains(subject)
    }

    /// Admit a subject if a slot is free. Returns `false` when at capacity;
    /// the caller decides whether a preemption path exists.
    pub(crate) fn admit(&mut self, subject: SubjectId) -> bool {
        if self.is_full() {
            return false;
        }
        info!(facility = %self.id, subject = %subject, occupancy = self.occupants.len() + 1, capacity = self.capacity, "subject admitted");
        self.occupants.push(subject);
        debug_assert!(self.occupants.len() <= self.capacity as usize);
        true
    }

    pub(crate) fn evict(&mut self, subject: &SubjectId) -> bool {
        let Some(position) = self.occupants.iter().position(|held| held == subject) else {
            return false;
        };
        self.occupants.remove(position);
        info!(facility = %self.id, subject = %subject, occupancy = self.occupants.len(), capacity = self.capacity, "subject released");
        true
    }

    pub fn view(&self) -> FacilityView {
        FacilityView {
            id: self.id.clone(),
            name: self.name.clone(),
            capacity: self.capacity,
            occupancy: self.occupants.len(),
            occupancy_ratio: self.occupancy_ratio(),
            occupants: self.occupants.clone(),
        }
    }
}

/// Owns the full facility set and the occupant-to-facility mapping.
///
/// Subjects are referenced by id only; the subject store lives outside the
/// pool, so priority lookups are passed in per call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacilityPool {
    facilities: Vec<Facility>,
}

impl FacilityPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Facility> {
        self.facilities.iter()
    }

    pub fn get(&self, id: &FacilityId) -> Option<&Facility> {
        self.facilities.iter().find(|facility| facility.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &FacilityId) -> Option<&mut Facility> {
        self.facilities
            .iter_mut()
            .find(|facility| facility.id() == id)
    }

    pub(crate) fn insert(&mut self, facility: Facility) {
        debug_assert!(self.get(facility.id()).is_none());
        self.facilities.push(facility);
    }

    pub(crate) fn remove(&mut self, id: &FacilityId) -> Option<Facility> {
        let position = self
            .facilities
            .iter()
            .position(|facility| facility.id() == id)?;
        Some(self.facilities.remove(position))
    }

    /// Aggregate capacity across all facilities. Recomputed from the
    /// authoritative collection on every call, never shadow-tracked.
    pub fn aggregate_capacity(&self) -> u32 {
        self.facilities
            .iter()
            .map(|facility| facility.capacity())
            .sum()
    }

    pub fn aggregate_occupancy(&self) -> usize {
        self.facilities
            .iter()
            .map(|facility| facility.occupancy())
            .sum()
    }

    /// True when every facility is simultaneously at capacity. Vacuously true
    /// for an empty pool; threshold selection falls back to the static value
    /// in that case.
    pub fn all_full(&self) -> bool {
        self.facilities.iter().all(|facility| facility.is_full())
    }

    /// Facility with the lowest occupancy ratio; ties keep the earliest-added
    /// facility. Under-filled facilities are always preferred over preemption.
    pub(crate) fn least_loaded_mut(&mut self) -> Option<&mut Facility> {
        let index = self
            .facilities
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.occupancy_ratio().total_cmp(&b.occupancy_ratio()))
            .map(|(index, _)| index)?;
        self.facilities.get_mut(index)
    }

    /// The occupant with the globally lowest priority across all facilities,
    /// together with the facility holding it.
    pub fn lowest_priority_occupant(
        &self,
        priorities: &HashMap<SubjectId, f64>,
    ) -> Option<(FacilityId, SubjectId, f64)> {
        self.facilities
            .iter()
            .flat_map(|facility| {
                facility.occupants().iter().filter_map(|subject| {
                    priorities
                        .get(subject)
                        .map(|score| (facility.id().clone(), subject.clone(), *score))
                })
            })
            .min_by(|(_, _, a), (_, _, b)| a.total_cmp(b))
    }

    pub fn facility_holding(&self, subject: &SubjectId) -> Option<&Facility> {
        self.facilities
            .iter()
            .find(|facility| facility.holds(subject))
    }

    /// Resize a facility, releasing the lowest-priority occupants first until
    /// the capacity invariant holds again. Returns the displaced subjects.
    pub(crate) fn resize(
        &mut self,
        id: &FacilityId,
        capacity: u32,
        priorities: &HashMap<SubjectId, f64>,
    ) -> Option<Vec<SubjectId>> {
        if capacity == 0 {
            return None;
        }
        let facility = self.get_mut(id)?;
        facility.capacity = capacity;

        let mut displaced = Vec::new();
        while facility.occupants.len() > facility.capacity as usize {
            let weakest = facility
                .occupants
                .iter()
                .min_by(|a, b| {
                    let a_score = priorities.get(*a).copied().unwrap_or(f64::MAX);
                    let b_score = priorities.get(*b).copied().unwrap_or(f64::MAX);
                    a_score.total_cmp(&b_score)
                })
                .cloned();
            match weakest {
                Some(subject) => {
                    facility.evict(&subject);
                    displaced.push(subject);
                }
                None => break,
            }
        }
        debug_assert!(facility.occupants.len() <= facility.capacity as usize);
        Some(displaced)
    }

    pub fn views(&self) -> Vec<FacilityView> {
        self.facilities.iter().map(Facility::view).collect()
    }
}

/// Facility occupancy statistics exposed to collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityView {
    pub id: FacilityId,
    pub name: String,
    pub capacity: u32,
    pub occupancy: usize,
    pub occupancy_ratio: f64,
    pub occupants: Vec<SubjectId>,
}
