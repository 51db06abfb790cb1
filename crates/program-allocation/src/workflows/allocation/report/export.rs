use std::collections::HashMap;

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::workflows::allocation::domain::{
    ApplicantId, ApplicantRecord, Assignment, Offering, OfferingId,
};

/// Spreadsheet tools need the byte-order mark to detect UTF-8 names.
const UTF8_BOM: &[u8] = "\u{feff}".as_bytes();

const HEADER: [&str; 4] = ["student_id", "name", "assigned_program", "choice_rank"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("there are no allocation results to export")]
    NoAssignments,
    #[error("failed to encode allocation export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to finish allocation export: {0}")]
    Io(#[from] std::io::Error),
}

/// Rendered export ready to be served as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub body: Vec<u8>,
}

/// One quoted row per assignment: applicant id, name, program name, and rank (0 when unranked).
pub fn render_csv(
    assignments: &[Assignment],
    applicants: &[ApplicantRecord],
    offerings: &[Offering],
    generated_on: NaiveDate,
) -> Result<CsvExport, ExportError> {
    if assignments.is_empty() {
        return Err(ExportError::NoAssignments);
    }

    let names: HashMap<&ApplicantId, &str> = applicants
        .iter()
        .map(|record| (&record.applicant_id, record.name.as_str()))
        .collect();
    let programs: HashMap<OfferingId, &str> = offerings
        .iter()
        .map(|offering| (offering.id, offering.name.as_str()))
        .collect();

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(UTF8_BOM.to_vec());

    writer.write_record(HEADER)?;
    for assignment in assignments {
        let rank = assignment.rank.as_number().to_string();
        writer.write_record([
            assignment.applicant_id.0.as_str(),
            names.get(&assignment.applicant_id).copied().unwrap_or(""),
            programs.get(&assignment.offering_id).copied().unwrap_or(""),
            rank.as_str(),
        ])?;
    }

    let body = writer
        .into_inner()
        .map_err(|err| std::io::Error::other(err.to_string()))?;

    Ok(CsvExport {
        filename: format!("allocation_results_{}.csv", generated_on.format("%Y-%m-%d")),
        body,
    })
}
