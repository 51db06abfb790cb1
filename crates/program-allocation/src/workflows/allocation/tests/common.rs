use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use crate::config::AllocationConfig;
use crate::workflows::allocation::domain::{
    ApplicantId, ApplicantRecord, ApplicantSubmission, Assignment, AssignmentId, EpochId,
    NewAssignment, NewOffering, Offering, OfferingId, PreferenceTriple,
};
use crate::workflows::allocation::repository::{
    ApplicantRepository, AssignmentRepository, OfferingRepository, RepositoryError,
};
use crate::workflows::allocation::{allocation_router, AllocationService};

#[derive(Default)]
struct MemoryState {
    offerings: BTreeMap<OfferingId, Offering>,
    applicants: BTreeMap<ApplicantId, ApplicantRecord>,
    epoch: Option<EpochId>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    next_offering: u64,
    next_assignment: u64,
}

#[derive(Default)]
pub(super) struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("store mutex poisoned")
    }
}

impl OfferingRepository for MemoryStore {
    fn list_offerings(&self) -> Result<Vec<Offering>, RepositoryError> {
        Ok(self.state().offerings.values().cloned().collect())
    }

    fn get_offering(&self, id: OfferingId) -> Result<Option<Offering>, RepositoryError> {
        Ok(self.state().offerings.get(&id).cloned())
    }

    fn insert_offering(&self, offering: NewOffering) -> Result<Offering, RepositoryError> {
        let mut state = self.state();
        state.next_offering += 1;
        let stored = Offering {
            id: OfferingId(state.next_offering),
            name: offering.name,
            category: offering.category,
            capacity: offering.capacity,
            description: offering.description,
            created_at: Utc::now(),
        };
        state.offerings.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn delete_offering(&self, id: OfferingId) -> Result<(), RepositoryError> {
        self.state()
            .offerings
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl ApplicantRepository for MemoryStore {
    fn list_applicants(&self) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Ok(self.state().applicants.values().cloned().collect())
    }

    fn get_applicant(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Ok(self.state().applicants.get(id).cloned())
    }

    fn insert_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut state = self.state();
        if state.applicants.contains_key(&record.applicant_id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .applicants
            .insert(record.applicant_id.clone(), record.clone());
        Ok(record)
    }

    fn update_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut state = self.state();
        match state.applicants.get_mut(&record.applicant_id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(record)
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

impl AssignmentRepository for MemoryStore {
    fn current_epoch(&self) -> Result<Option<EpochId>, RepositoryError> {
        Ok(self.state().epoch)
    }

    fn list_assignments(&self) -> Result<Vec<Assignment>, RepositoryError> {
        Ok(self.state().assignments.values().cloned().collect())
    }

    fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, RepositoryError> {
        Ok(self.state().assignments.get(&id).cloned())
    }

    fn install_epoch(
        &self,
        assignments: Vec<NewAssignment>,
    ) -> Result<(EpochId, Vec<Assignment>), RepositoryError> {
        let mut state = self.state();
        let epoch = state.epoch.map(EpochId::next).unwrap_or(EpochId(1));
        let mut installed = BTreeMap::new();
        for pending in assignments {
            state.next_assignment += 1;
            let assignment = Assignment {
                id: AssignmentId(state.next_assignment),
                epoch,
                applicant_id: pending.applicant_id,
                offering_id: pending.offering_id,
                rank: pending.rank,
                method: pending.method,
                assigned_at: pending.assigned_at,
            };
            installed.insert(assignment.id, assignment);
        }
        state.epoch = Some(epoch);
        state.assignments = installed;
        Ok((epoch, state.assignments.values().cloned().collect()))
    }

    fn update_assignment(&self, assignment: Assignment) -> Result<Assignment, RepositoryError> {
        let mut state = self.state();
        if state.epoch != Some(assignment.epoch) {
            return Err(RepositoryError::NotFound);
        }
        match state.assignments.get_mut(&assignment.id) {
            Some(stored) => {
                *stored = assignment.clone();
                Ok(assignment)
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

pub(super) struct UnavailableStore;

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl OfferingRepository for UnavailableStore {
    fn list_offerings(&self) -> Result<Vec<Offering>, RepositoryError> {
        Err(offline())
    }

    fn get_offering(&self, _id: OfferingId) -> Result<Option<Offering>, RepositoryError> {
        Err(offline())
    }

    fn insert_offering(&self, _offering: NewOffering) -> Result<Offering, RepositoryError> {
        Err(offline())
    }

    fn delete_offering(&self, _id: OfferingId) -> Result<(), RepositoryError> {
        Err(offline())
    }
}

impl ApplicantRepository for UnavailableStore {
    fn list_applicants(&self) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Err(offline())
    }

    fn get_applicant(&self, _id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Err(offline())
    }

    fn insert_applicant(&self, _record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        Err(offline())
    }

    fn update_applicant(&self, _record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        Err(offline())
    }
}

impl AssignmentRepository for UnavailableStore {
    fn current_epoch(&self) -> Result<Option<EpochId>, RepositoryError> {
        Err(offline())
    }

    fn list_assignments(&self) -> Result<Vec<Assignment>, RepositoryError> {
        Err(offline())
    }

    fn get_assignment(&self, _id: AssignmentId) -> Result<Option<Assignment>, RepositoryError> {
        Err(offline())
    }

    fn install_epoch(
        &self,
        _assignments: Vec<NewAssignment>,
    ) -> Result<(EpochId, Vec<Assignment>), RepositoryError> {
        Err(offline())
    }

    fn update_assignment(&self, _assignment: Assignment) -> Result<Assignment, RepositoryError> {
        Err(offline())
    }
}

pub(super) fn build_service() -> (AllocationService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = AllocationService::new(store.clone(), AllocationConfig::default());
    (service, store)
}

pub(super) fn program(name: &str, capacity: u32) -> NewOffering {
    NewOffering {
        name: name.to_string(),
        category: "career experience".to_string(),
        capacity,
        description: format!("{name} field day"),
    }
}

/// Create programs in order; the returned ids follow the input order.
pub(super) fn seed_catalog(
    service: &AllocationService<MemoryStore>,
    programs: &[(&str, u32)],
) -> Vec<OfferingId> {
    programs
        .iter()
        .map(|(name, capacity)| {
            service
                .create_offering(program(name, *capacity))
                .expect("program created")
                .id
        })
        .collect()
}

pub(super) fn submission(id: &str, choices: [OfferingId; 3]) -> ApplicantSubmission {
    ApplicantSubmission {
        applicant_id: ApplicantId(id.to_string()),
        name: format!("Student {id}"),
        phone: None,
        birthdate: None,
        choices: PreferenceTriple(choices),
    }
}

pub(super) fn verified(
    mut submission: ApplicantSubmission,
    phone: &str,
    birthdate: &str,
) -> ApplicantSubmission {
    submission.phone = Some(phone.to_string());
    submission.birthdate = Some(birthdate.to_string());
    submission
}

pub(super) fn record(id: &str, choices: [OfferingId; 3]) -> ApplicantRecord {
    let now = Utc::now();
    ApplicantRecord {
        applicant_id: ApplicantId(id.to_string()),
        name: format!("Student {id}"),
        phone: None,
        birthdate: None,
        choices: PreferenceTriple(choices),
        submission_count: 1,
        first_submitted_at: now,
        last_submitted_at: now,
    }
}

pub(super) fn offering(id: u64, capacity: u32) -> Offering {
    Offering {
        id: OfferingId(id),
        name: format!("Program {id}"),
        category: "career experience".to_string(),
        capacity,
        description: String::new(),
        created_at: Utc::now(),
    }
}

pub(super) fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub(super) fn router_with_service(service: AllocationService<MemoryStore>) -> axum::Router {
    allocation_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
