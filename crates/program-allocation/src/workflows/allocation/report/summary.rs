use std::collections::HashMap;

use crate::workflows::allocation::domain::{
    ApplicantId, ApplicantRecord, Assignment, ChoiceRank, Offering, OfferingId, Rank,
};

use super::views::{
    AllocationResultsView, ApplicationsOverview, AssignmentView, OfferingAllocationStats,
    OfferingDemand, UNKNOWN_LABEL,
};

pub fn applications_overview(
    applications: Vec<ApplicantRecord>,
    offerings: &[Offering],
) -> ApplicationsOverview {
    let program_demand = offerings
        .iter()
        .map(|offering| {
            let count = |rank: ChoiceRank| {
                applications
                    .iter()
                    .filter(|record| record.choices.at(rank) == offering.id)
                    .count()
            };
            let first_choice = count(ChoiceRank::First);
            let second_choice = count(ChoiceRank::Second);
            let third_choice = count(ChoiceRank::Third);

            OfferingDemand {
                program_id: offering.id,
                program_name: offering.name.clone(),
                capacity: offering.capacity,
                first_choice,
                second_choice,
                third_choice,
                total: first_choice + second_choice + third_choice,
            }
        })
        .collect();

    ApplicationsOverview {
        total_applications: applications.len(),
        applications,
        program_demand,
    }
}

pub fn allocation_results(
    assignments: Vec<Assignment>,
    applicants: &[ApplicantRecord],
    offerings: &[Offering],
) -> AllocationResultsView {
    let names: HashMap<&ApplicantId, &str> = applicants
        .iter()
        .map(|record| (&record.applicant_id, record.name.as_str()))
        .collect();
    let programs: HashMap<OfferingId, &str> = offerings
        .iter()
        .map(|offering| (offering.id, offering.name.as_str()))
        .collect();

    let program_stats = offerings
        .iter()
        .map(|offering| {
            let placed: Vec<&Assignment> = assignments
                .iter()
                .filter(|assignment| assignment.offering_id == offering.id)
                .collect();
            let at = |rank: Rank| placed.iter().filter(|a| a.rank == rank).count();

            OfferingAllocationStats {
                program_id: offering.id,
                program_name: offering.name.clone(),
                capacity: offering.capacity,
                allocated: placed.len(),
                remaining: (offering.capacity as usize).saturating_sub(placed.len()),
                first_choice: at(Rank::Preferred(ChoiceRank::First)),
                second_choice: at(Rank::Preferred(ChoiceRank::Second)),
                third_choice: at(Rank::Preferred(ChoiceRank::Third)),
                unranked: at(Rank::Unranked),
            }
        })
        .collect();

    let total_allocated = assignments.len();
    let total_unallocated = applicants.len().saturating_sub(total_allocated);

    let assignments = assignments
        .into_iter()
        .map(|assignment| AssignmentView {
            applicant_name: names
                .get(&assignment.applicant_id)
                .copied()
                .unwrap_or(UNKNOWN_LABEL)
                .to_string(),
            program_name: programs
                .get(&assignment.offering_id)
                .copied()
                .unwrap_or(UNKNOWN_LABEL)
                .to_string(),
            assignment,
        })
        .collect();

    AllocationResultsView {
        assignments,
        program_stats,
        total_allocated,
        total_unallocated,
    }
}
