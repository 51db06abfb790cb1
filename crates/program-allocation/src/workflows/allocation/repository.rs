use super::domain::{
    ApplicantId, ApplicantRecord, Assignment, AssignmentId, EpochId, NewAssignment, NewOffering,
    Offering, OfferingId,
};

/// Program catalog storage.
pub trait OfferingRepository: Send + Sync {
    fn list_offerings(&self) -> Result<Vec<Offering>, RepositoryError>;
    fn get_offering(&self, id: OfferingId) -> Result<Option<Offering>, RepositoryError>;
    fn insert_offering(&self, offering: NewOffering) -> Result<Offering, RepositoryError>;
    fn delete_offering(&self, id: OfferingId) -> Result<(), RepositoryError>;
}

/// Applicant preference records keyed by applicant id.
pub trait ApplicantRepository: Send + Sync {
    fn list_applicants(&self) -> Result<Vec<ApplicantRecord>, RepositoryError>;
    fn get_applicant(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError>;
    /// Fails with `Conflict` when the applicant id is already present.
    fn insert_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError>;
    /// Fails with `NotFound` when the applicant id is absent.
    fn update_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError>;
}

/// Epoch-scoped assignment storage. Every read only sees the current epoch.
pub trait AssignmentRepository: Send + Sync {
    fn current_epoch(&self) -> Result<Option<EpochId>, RepositoryError>;
    fn list_assignments(&self) -> Result<Vec<Assignment>, RepositoryError>;
    fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, RepositoryError>;
    /// Replace the current epoch with `assignments` in one step, assigning ids and a new epoch.
    fn install_epoch(
        &self,
        assignments: Vec<NewAssignment>,
    ) -> Result<(EpochId, Vec<Assignment>), RepositoryError>;
    /// Fails with `NotFound` unless the assignment belongs to the current epoch.
    fn update_assignment(&self, assignment: Assignment) -> Result<Assignment, RepositoryError>;
}

/// Everything the allocation service needs from persistence.
pub trait AllocationStore: OfferingRepository + ApplicantRepository + AssignmentRepository {}

impl<T> AllocationStore for T where T: OfferingRepository + ApplicantRepository + AssignmentRepository
{}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
