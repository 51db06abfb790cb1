//! Identity-verified resubmission protocol.
//!
//! The first submission for an applicant id always lands. Every later submission must carry both
//! verification fields, and any field already on file must match. A resubmission that supplies a
//! field for the first time claims it, so later resubmissions are checked against that value.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApplicantRecord, ApplicantSubmission};

/// Verification field checked during resubmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationField {
    Phone,
    Birthdate,
}

impl VerificationField {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationField::Phone => "phone",
            VerificationField::Birthdate => "birthdate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("applicant already submitted; phone and birthdate are required to resubmit")]
    MissingVerificationFields,
    #[error("{} does not match the value on file", .field.label())]
    IdentityMismatch { field: VerificationField },
}

/// Record produced by the ledger together with how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub record: ApplicantRecord,
    pub is_resubmission: bool,
}

/// Apply `candidate` on top of the stored record for the same applicant id.
///
/// `existing` must belong to the candidate's applicant id; callers look it up by that key.
pub fn record_submission(
    existing: Option<ApplicantRecord>,
    candidate: ApplicantSubmission,
    now: DateTime<Utc>,
) -> Result<LedgerEntry, VerificationError> {
    let ApplicantSubmission {
        applicant_id,
        name,
        phone,
        birthdate,
        choices,
    } = candidate;
    let phone = normalized(phone);
    let birthdate = normalized(birthdate);

    let Some(mut record) = existing else {
        let record = ApplicantRecord {
            applicant_id,
            name,
            phone,
            birthdate,
            choices,
            submission_count: 1,
            first_submitted_at: now,
            last_submitted_at: now,
        };
        return Ok(LedgerEntry {
            record,
            is_resubmission: false,
        });
    };

    let (Some(phone), Some(birthdate)) = (phone, birthdate) else {
        return Err(VerificationError::MissingVerificationFields);
    };

    verify(record.phone.as_deref(), &phone, VerificationField::Phone)?;
    verify(
        record.birthdate.as_deref(),
        &birthdate,
        VerificationField::Birthdate,
    )?;

    record.name = name;
    record.phone = Some(phone);
    record.birthdate = Some(birthdate);
    record.choices = choices;
    record.submission_count += 1;
    record.last_submitted_at = now;

    Ok(LedgerEntry {
        record,
        is_resubmission: true,
    })
}

fn verify(
    stored: Option<&str>,
    supplied: &str,
    field: VerificationField,
) -> Result<(), VerificationError> {
    match stored {
        Some(stored) if stored != supplied => Err(VerificationError::IdentityMismatch { field }),
        _ => Ok(()),
    }
}

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
