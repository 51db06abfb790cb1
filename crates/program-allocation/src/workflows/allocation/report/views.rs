use serde::Serialize;

use crate::workflows::allocation::domain::{ApplicantRecord, Assignment, EpochId, OfferingId};

/// Shown when a referenced applicant or program no longer resolves.
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub message: &'static str,
    pub is_resubmission: bool,
    pub application: ApplicantRecord,
}

/// How many applicants listed a program at each rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferingDemand {
    pub program_id: OfferingId,
    pub program_name: String,
    pub capacity: u32,
    pub first_choice: usize,
    pub second_choice: usize,
    pub third_choice: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationsOverview {
    pub applications: Vec<ApplicantRecord>,
    pub program_demand: Vec<OfferingDemand>,
    pub total_applications: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationRunSummary {
    pub message: &'static str,
    pub epoch: EpochId,
    pub total_applicants: usize,
    pub allocated_count: usize,
    pub unallocated_count: usize,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub applicant_name: String,
    pub program_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferingAllocationStats {
    pub program_id: OfferingId,
    pub program_name: String,
    pub capacity: u32,
    pub allocated: usize,
    pub remaining: usize,
    pub first_choice: usize,
    pub second_choice: usize,
    pub third_choice: usize,
    pub unranked: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationResultsView {
    pub assignments: Vec<AssignmentView>,
    pub program_stats: Vec<OfferingAllocationStats>,
    pub total_allocated: usize,
    pub total_unallocated: usize,
}
