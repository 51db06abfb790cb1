use std::collections::HashSet;

use super::domain::{ApplicantId, ApplicantSubmission, NewOffering, Offering, OfferingId};

/// Validation errors raised before a submission or catalog entry reaches the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be blank")]
    BlankField { field: &'static str },
    #[error("program {0} is listed more than once; choices must be distinct")]
    DuplicateChoice(OfferingId),
    #[error("program {0} does not exist")]
    UnknownOffering(OfferingId),
}

/// Trim free-text fields and check that every choice is distinct and resolves in `catalog`.
pub(crate) fn sanitize_submission(
    submission: ApplicantSubmission,
    catalog: &[Offering],
) -> Result<ApplicantSubmission, ValidationError> {
    let applicant_id = ApplicantId(required(submission.applicant_id.0, "applicant_id")?);
    let name = required(submission.name, "name")?;

    if let Some(duplicate) = submission.choices.duplicate() {
        return Err(ValidationError::DuplicateChoice(duplicate));
    }

    let known: HashSet<OfferingId> = catalog.iter().map(|offering| offering.id).collect();
    if let Some((_, unknown)) = submission
        .choices
        .iter()
        .find(|(_, offering)| !known.contains(offering))
    {
        return Err(ValidationError::UnknownOffering(unknown));
    }

    Ok(ApplicantSubmission {
        applicant_id,
        name,
        ..submission
    })
}

pub(crate) fn sanitize_offering(offering: NewOffering) -> Result<NewOffering, ValidationError> {
    Ok(NewOffering {
        name: required(offering.name, "name")?,
        category: required(offering.category, "category")?,
        capacity: offering.capacity,
        description: offering.description.trim().to_string(),
    })
}

fn required(value: String, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::BlankField { field })
    } else {
        Ok(trimmed.to_string())
    }
}
