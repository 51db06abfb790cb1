use serde::Serialize;

use super::domain::{
    Assignment, AssignmentId, AssignmentMethod, Offering, OfferingId, PreferenceTriple, Rank,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReassignError {
    #[error("assignment {0} not found in the current allocation")]
    AssignmentNotFound(AssignmentId),
    #[error("assignment is already placed in program {0}")]
    SameOffering(OfferingId),
    #[error("program {0} does not exist")]
    OfferingNotFound(OfferingId),
    #[error("{name} is full ({assigned}/{capacity})")]
    CapacityExceeded {
        offering: OfferingId,
        name: String,
        assigned: usize,
        capacity: u32,
    },
}

/// Offering reference carried in the before/after summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferingRef {
    pub program_id: OfferingId,
    pub program_name: String,
}

/// A completed manual move with its audit summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub assignment: Assignment,
    pub from: OfferingRef,
    pub to: OfferingRef,
}

/// Compute the moved assignment for a manual override.
///
/// `target` is the looked-up target offering (absent when `target_id` does not resolve), `epoch`
/// the full current assignment set, and `preferences` the moved applicant's stated choices. The
/// caller persists the returned record; `current` is left untouched.
pub fn plan_reassignment(
    current: &Assignment,
    target_id: OfferingId,
    target: Option<&Offering>,
    epoch: &[Assignment],
    preferences: Option<&PreferenceTriple>,
) -> Result<Assignment, ReassignError> {
    if current.offering_id == target_id {
        return Err(ReassignError::SameOffering(target_id));
    }

    let target = target.ok_or(ReassignError::OfferingNotFound(target_id))?;

    let assigned = epoch
        .iter()
        .filter(|assignment| assignment.id != current.id && assignment.offering_id == target.id)
        .count();
    if assigned >= target.capacity as usize {
        return Err(ReassignError::CapacityExceeded {
            offering: target.id,
            name: target.name.clone(),
            assigned,
            capacity: target.capacity,
        });
    }

    let rank = preferences
        .map(|choices| choices.rank_of(target.id))
        .unwrap_or(Rank::Unranked);

    Ok(Assignment {
        offering_id: target.id,
        rank,
        method: AssignmentMethod::Manual,
        ..current.clone()
    })
}
