use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use program_allocation::workflows::allocation::{
    ApplicantId, ApplicantRecord, ApplicantRepository, Assignment, AssignmentId,
    AssignmentRepository, EpochId, NewAssignment, NewOffering, Offering, OfferingId,
    OfferingRepository, RepositoryError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Assignments of the current epoch. Replaced as a whole on every allocation run.
#[derive(Default)]
struct EpochTable {
    epoch: Option<EpochId>,
    assignments: BTreeMap<AssignmentId, Assignment>,
}

/// Process-local store backing the HTTP service and the simulation command.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAllocationStore {
    offerings: Arc<RwLock<BTreeMap<OfferingId, Offering>>>,
    applicants: Arc<RwLock<BTreeMap<ApplicantId, ApplicantRecord>>>,
    epoch: Arc<RwLock<EpochTable>>,
    offering_sequence: Arc<AtomicU64>,
    assignment_sequence: Arc<AtomicU64>,
}

fn poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("in-memory store lock poisoned".to_string())
}

impl OfferingRepository for InMemoryAllocationStore {
    fn list_offerings(&self) -> Result<Vec<Offering>, RepositoryError> {
        let guard = self.offerings.read().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }

    fn get_offering(&self, id: OfferingId) -> Result<Option<Offering>, RepositoryError> {
        let guard = self.offerings.read().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    fn insert_offering(&self, offering: NewOffering) -> Result<Offering, RepositoryError> {
        let id = OfferingId(self.offering_sequence.fetch_add(1, Ordering::Relaxed) + 1);
        let stored = Offering {
            id,
            name: offering.name,
            category: offering.category,
            capacity: offering.capacity,
            description: offering.description,
            created_at: Utc::now(),
        };
        let mut guard = self.offerings.write().map_err(poisoned)?;
        guard.insert(id, stored.clone());
        Ok(stored)
    }

    fn delete_offering(&self, id: OfferingId) -> Result<(), RepositoryError> {
        let mut guard = self.offerings.write().map_err(poisoned)?;
        guard
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl ApplicantRepository for InMemoryAllocationStore {
    fn list_applicants(&self) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        let guard = self.applicants.read().map_err(poisoned)?;
        let mut records: Vec<ApplicantRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.last_submitted_at.cmp(&a.last_submitted_at));
        Ok(records)
    }

    fn get_applicant(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let guard = self.applicants.read().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn insert_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = self.applicants.write().map_err(poisoned)?;
        if guard.contains_key(&record.applicant_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.applicant_id.clone(), record.clone());
        Ok(record)
    }

    fn update_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = self.applicants.write().map_err(poisoned)?;
        match guard.get_mut(&record.applicant_id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(record)
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

impl AssignmentRepository for InMemoryAllocationStore {
    fn current_epoch(&self) -> Result<Option<EpochId>, RepositoryError> {
        let guard = self.epoch.read().map_err(poisoned)?;
        Ok(guard.epoch)
    }

    fn list_assignments(&self) -> Result<Vec<Assignment>, RepositoryError> {
        let guard = self.epoch.read().map_err(poisoned)?;
        Ok(guard.assignments.values().cloned().collect())
    }

    fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, RepositoryError> {
        let guard = self.epoch.read().map_err(poisoned)?;
        Ok(guard.assignments.get(&id).cloned())
    }

    fn install_epoch(
        &self,
        assignments: Vec<NewAssignment>,
    ) -> Result<(EpochId, Vec<Assignment>), RepositoryError> {
        let mut guard = self.epoch.write().map_err(poisoned)?;
        let epoch = guard.epoch.map(EpochId::next).unwrap_or(EpochId(1));

        let installed: BTreeMap<AssignmentId, Assignment> = assignments
            .into_iter()
            .map(|pending| {
                let id = AssignmentId(self.assignment_sequence.fetch_add(1, Ordering::Relaxed) + 1);
                let assignment = Assignment {
                    id,
                    epoch,
                    applicant_id: pending.applicant_id,
                    offering_id: pending.offering_id,
                    rank: pending.rank,
                    method: pending.method,
                    assigned_at: pending.assigned_at,
                };
                (id, assignment)
            })
            .collect();

        let listed = installed.values().cloned().collect();
        *guard = EpochTable {
            epoch: Some(epoch),
            assignments: installed,
        };
        Ok((epoch, listed))
    }

    fn update_assignment(&self, assignment: Assignment) -> Result<Assignment, RepositoryError> {
        let mut guard = self.epoch.write().map_err(poisoned)?;
        if guard.epoch != Some(assignment.epoch) {
            return Err(RepositoryError::NotFound);
        }
        match guard.assignments.get_mut(&assignment.id) {
            Some(stored) => {
                *stored = assignment.clone();
                Ok(assignment)
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

pub(crate) fn parse_seed(raw: &str) -> Result<u64, String> {
    raw.trim()
        .parse::<u64>()
        .map_err(|err| format!("failed to parse '{raw}' as an unsigned seed ({err})"))
}
