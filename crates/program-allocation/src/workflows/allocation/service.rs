use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::config::AllocationConfig;

use super::domain::{
    ApplicantId, ApplicantSubmission, AssignmentId, AssignmentMethod, NewAssignment, NewOffering,
    Offering, OfferingId, Rank,
};
use super::engine::{self, AllocationError};
use super::intake::{self, ValidationError};
use super::ledger::{self, VerificationError};
use super::locks::KeyedLocks;
use super::reallocation::{self, OfferingRef, ReassignError, Reassignment};
use super::report::views::UNKNOWN_LABEL;
use super::report::{
    self, AllocationResultsView, AllocationRunSummary, ApplicationsOverview, CsvExport,
    ExportError, SubmissionReceipt,
};
use super::repository::{AllocationStore, RepositoryError};

/// Facade composing the identity ledger, allocation engine, and reallocation rules over a store.
///
/// Allocation runs take the epoch gate exclusively, so at most one run is in flight and no
/// reassignment observes a half-installed epoch. Submissions serialize per applicant id and
/// reassignments per target program.
pub struct AllocationService<S> {
    store: Arc<S>,
    config: AllocationConfig,
    epoch_gate: RwLock<()>,
    applicant_locks: KeyedLocks<ApplicantId>,
    offering_locks: KeyedLocks<OfferingId>,
}

impl<S> AllocationService<S>
where
    S: AllocationStore + 'static,
{
    pub fn new(store: Arc<S>, config: AllocationConfig) -> Self {
        Self {
            store,
            config,
            epoch_gate: RwLock::new(()),
            applicant_locks: KeyedLocks::default(),
            offering_locks: KeyedLocks::default(),
        }
    }

    pub fn config(&self) -> AllocationConfig {
        self.config
    }

    #[cfg(test)]
    pub(crate) fn lock_entries(&self) -> usize {
        self.applicant_locks.len() + self.offering_locks.len()
    }

    pub fn list_offerings(&self) -> Result<Vec<Offering>, AllocationServiceError> {
        Ok(self.store.list_offerings()?)
    }

    pub fn create_offering(
        &self,
        offering: NewOffering,
    ) -> Result<Offering, AllocationServiceError> {
        let offering = intake::sanitize_offering(offering)?;
        let stored = self.store.insert_offering(offering)?;
        info!(program_id = %stored.id, name = %stored.name, capacity = stored.capacity, "program created");
        Ok(stored)
    }

    /// Remove a program unless the current allocation still places applicants in it.
    pub fn delete_offering(&self, id: OfferingId) -> Result<Offering, AllocationServiceError> {
        let _epoch = self.epoch_gate.read().unwrap_or_else(PoisonError::into_inner);
        let handle = self.offering_locks.handle(&id);
        let _offering = handle.lock();

        let offering = self
            .store
            .get_offering(id)?
            .ok_or(CatalogError::OfferingNotFound(id))?;

        let referencing = self
            .store
            .list_assignments()?
            .iter()
            .filter(|assignment| assignment.offering_id == id)
            .count();
        if referencing > 0 {
            warn!(program_id = %id, referencing, "refused to delete program with placements");
            return Err(CatalogError::OfferingInUse {
                offering: id,
                assignments: referencing,
            }
            .into());
        }

        self.store.delete_offering(id)?;
        info!(program_id = %id, name = %offering.name, "program deleted");
        Ok(offering)
    }

    /// Record a fresh submission or a verified resubmission.
    pub fn submit(
        &self,
        submission: ApplicantSubmission,
    ) -> Result<SubmissionReceipt, AllocationServiceError> {
        let catalog = self.store.list_offerings()?;
        let submission = intake::sanitize_submission(submission, &catalog)?;
        let applicant_id = submission.applicant_id.clone();

        let handle = self.applicant_locks.handle(&applicant_id);
        let _applicant = handle.lock();

        let existing = self.store.get_applicant(&applicant_id)?;
        let entry = ledger::record_submission(existing, submission, Utc::now()).inspect_err(
            |error| warn!(applicant_id = %applicant_id, %error, "resubmission rejected"),
        )?;

        let application = if entry.is_resubmission {
            self.store.update_applicant(entry.record)?
        } else {
            self.store.insert_applicant(entry.record)?
        };

        info!(
            applicant_id = %application.applicant_id,
            resubmission = entry.is_resubmission,
            submission_count = application.submission_count,
            "application recorded"
        );

        let message = if entry.is_resubmission {
            "application resubmitted"
        } else {
            "application submitted"
        };

        Ok(SubmissionReceipt {
            message,
            is_resubmission: entry.is_resubmission,
            application,
        })
    }

    pub fn applications_overview(&self) -> Result<ApplicationsOverview, AllocationServiceError> {
        let applications = self.store.list_applicants()?;
        let offerings = self.store.list_offerings()?;
        Ok(report::applications_overview(applications, &offerings))
    }

    /// Run an allocation with the configured random source and replace the current epoch.
    pub fn allocate(&self) -> Result<AllocationRunSummary, AllocationServiceError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.allocate_with_rng(&mut rng)
    }

    /// Run an allocation drawing the tie-break permutation from `rng`.
    pub fn allocate_with_rng<R>(
        &self,
        rng: &mut R,
    ) -> Result<AllocationRunSummary, AllocationServiceError>
    where
        R: Rng + ?Sized,
    {
        let _epoch = self.epoch_gate.write().unwrap_or_else(PoisonError::into_inner);

        let applicants = self.store.list_applicants()?;
        let offerings = self.store.list_offerings()?;
        let result = engine::allocate(&applicants, &offerings, rng)?;

        let assigned_at = Utc::now();
        let total_applicants = result.total_applicants();
        let unallocated_count = result.unallocated_count();
        let placements = result
            .placements
            .into_iter()
            .map(|placement| NewAssignment {
                applicant_id: placement.applicant_id,
                offering_id: placement.offering_id,
                rank: Rank::Preferred(placement.rank),
                method: AssignmentMethod::Automatic,
                assigned_at,
            })
            .collect();

        let (epoch, assignments) = self.store.install_epoch(placements)?;

        info!(
            %epoch,
            total_applicants,
            allocated = assignments.len(),
            unallocated = unallocated_count,
            seeded = self.config.seed.is_some(),
            "allocation run complete"
        );

        Ok(AllocationRunSummary {
            message: "allocation complete",
            epoch,
            total_applicants,
            allocated_count: assignments.len(),
            unallocated_count,
            assignments,
        })
    }

    pub fn results(&self) -> Result<AllocationResultsView, AllocationServiceError> {
        let _epoch = self.epoch_gate.read().unwrap_or_else(PoisonError::into_inner);
        let assignments = self.store.list_assignments()?;
        let applicants = self.store.list_applicants()?;
        let offerings = self.store.list_offerings()?;
        Ok(report::allocation_results(
            assignments,
            &applicants,
            &offerings,
        ))
    }

    /// Manually move one assignment of the current epoch to another program.
    pub fn reassign(
        &self,
        assignment_id: AssignmentId,
        target_id: OfferingId,
    ) -> Result<Reassignment, AllocationServiceError> {
        let _epoch = self.epoch_gate.read().unwrap_or_else(PoisonError::into_inner);
        let handle = self.offering_locks.handle(&target_id);
        let _target = handle.lock();

        // Read under the target lock so a racing move into the same program is observed.
        let current = self
            .store
            .get_assignment(assignment_id)?
            .ok_or(ReassignError::AssignmentNotFound(assignment_id))?;

        let target = self.store.get_offering(target_id)?;
        let epoch = self.store.list_assignments()?;
        let applicant = self.store.get_applicant(&current.applicant_id)?;

        let moved = reallocation::plan_reassignment(
            &current,
            target_id,
            target.as_ref(),
            &epoch,
            applicant.as_ref().map(|record| &record.choices),
        )
        .inspect_err(|error| {
            warn!(assignment_id = %assignment_id, program_id = %target_id, %error, "reassignment rejected")
        })?;

        let updated = self
            .store
            .update_assignment(moved)
            .map_err(|error| match error {
                RepositoryError::NotFound => {
                    AllocationServiceError::from(ReassignError::AssignmentNotFound(assignment_id))
                }
                other => other.into(),
            })?;

        let from_name = self
            .store
            .get_offering(current.offering_id)?
            .map(|offering| offering.name)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let to_name = target
            .map(|offering| offering.name)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

        info!(
            assignment_id = %assignment_id,
            applicant_id = %updated.applicant_id,
            from = %current.offering_id,
            to = %updated.offering_id,
            rank = updated.rank.as_number(),
            "assignment moved manually"
        );

        Ok(Reassignment {
            assignment: updated,
            from: OfferingRef {
                program_id: current.offering_id,
                program_name: from_name,
            },
            to: OfferingRef {
                program_id: target_id,
                program_name: to_name,
            },
        })
    }

    /// CSV rendering of the current epoch, named after today's date.
    pub fn export_csv(&self) -> Result<CsvExport, AllocationServiceError> {
        let _epoch = self.epoch_gate.read().unwrap_or_else(PoisonError::into_inner);
        let assignments = self.store.list_assignments()?;
        let applicants = self.store.list_applicants()?;
        let offerings = self.store.list_offerings()?;
        Ok(report::render_csv(
            &assignments,
            &applicants,
            &offerings,
            Utc::now().date_naive(),
        )?)
    }
}

/// Catalog maintenance failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("program {0} does not exist")]
    OfferingNotFound(OfferingId),
    #[error("program {offering} still has {assignments} placement(s) in the current allocation")]
    OfferingInUse {
        offering: OfferingId,
        assignments: usize,
    },
}

/// Error raised by the allocation service.
#[derive(Debug, thiserror::Error)]
pub enum AllocationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Reassign(#[from] ReassignError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
