//! Preference-ranked placement of applicants into capacity-limited programs.
//!
//! Applicants submit three distinct ranked choices through the identity ledger, an allocation run
//! places them greedily by rank behind a random permutation, and staff can move individual
//! placements afterwards within program capacity.

pub mod capacity;
pub mod domain;
pub mod engine;
pub(crate) mod intake;
pub mod ledger;
pub(crate) mod locks;
pub mod reallocation;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use capacity::CapacityTracker;
pub use domain::{
    ApplicantId, ApplicantRecord, ApplicantSubmission, Assignment, AssignmentId,
    AssignmentMethod, ChoiceRank, EpochId, NewAssignment, NewOffering, Offering, OfferingId,
    PreferenceTriple, Rank,
};
pub use engine::{allocate, AllocationError, AllocationResult, Placement};
pub use intake::ValidationError;
pub use ledger::{record_submission, LedgerEntry, VerificationError, VerificationField};
pub use reallocation::{plan_reassignment, OfferingRef, ReassignError, Reassignment};
pub use report::{
    AllocationResultsView, AllocationRunSummary, ApplicationsOverview, AssignmentView, CsvExport,
    ExportError, OfferingAllocationStats, OfferingDemand, SubmissionReceipt,
};
pub use repository::{
    AllocationStore, ApplicantRepository, AssignmentRepository, OfferingRepository,
    RepositoryError,
};
pub use router::{allocation_router, ReassignRequest};
pub use service::{AllocationService, AllocationServiceError, CatalogError};
