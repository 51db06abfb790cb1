//! Priority-rank greedy placement.
//!
//! Applicants are shuffled once per run. Each rank pass walks that single permutation, so the
//! order that decides a contested first-choice seat also decides contested second and third
//! choices. Applicants left without a seat after the third pass stay unallocated.

use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use super::capacity::CapacityTracker;
use super::domain::{ApplicantId, ApplicantRecord, ChoiceRank, Offering, OfferingId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("there are no applications to allocate")]
    NoApplicants,
}

/// One seat handed out by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub applicant_id: ApplicantId,
    pub offering_id: OfferingId,
    pub rank: ChoiceRank,
}

/// Outcome of a run, before the placements are persisted as an epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationResult {
    pub placements: Vec<Placement>,
    pub unallocated: Vec<ApplicantId>,
    pub remaining: BTreeMap<OfferingId, u32>,
}

impl AllocationResult {
    pub fn allocated_count(&self) -> usize {
        self.placements.len()
    }

    pub fn unallocated_count(&self) -> usize {
        self.unallocated.len()
    }

    pub fn total_applicants(&self) -> usize {
        self.allocated_count() + self.unallocated_count()
    }
}

/// Place applicants into offerings by rank, breaking ties with a permutation drawn from `rng`.
///
/// Applicant records sharing an id are considered once, using the first occurrence. Preference
/// references are expected to resolve within `offerings`; an unknown reference simply never has
/// a free seat.
pub fn allocate<R>(
    applicants: &[ApplicantRecord],
    offerings: &[Offering],
    rng: &mut R,
) -> Result<AllocationResult, AllocationError>
where
    R: Rng + ?Sized,
{
    if applicants.is_empty() {
        return Err(AllocationError::NoApplicants);
    }

    let mut capacity = CapacityTracker::from_offerings(offerings);

    let mut seen = HashSet::with_capacity(applicants.len());
    let mut order: Vec<&ApplicantRecord> = applicants
        .iter()
        .filter(|record| seen.insert(&record.applicant_id))
        .collect();
    order.shuffle(rng);

    let mut assigned = vec![false; order.len()];
    let mut placements = Vec::new();

    for rank in ChoiceRank::ALL {
        for (slot, record) in order.iter().enumerate() {
            if assigned[slot] {
                continue;
            }

            let offering_id = record.choices.at(rank);
            if capacity.try_claim(offering_id) {
                assigned[slot] = true;
                placements.push(Placement {
                    applicant_id: record.applicant_id.clone(),
                    offering_id,
                    rank,
                });
            }
        }
    }

    let unallocated = order
        .iter()
        .zip(&assigned)
        .filter(|(_, placed)| !**placed)
        .map(|(record, _)| record.applicant_id.clone())
        .collect();

    Ok(AllocationResult {
        placements,
        unallocated,
        remaining: capacity.into_remaining(),
    })
}
