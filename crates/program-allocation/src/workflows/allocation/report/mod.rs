//! Read models and export rendering built from catalog, applicant, and epoch snapshots.

pub mod export;
pub mod summary;
pub mod views;

pub use export::{render_csv, CsvExport, ExportError};
pub use summary::{allocation_results, applications_overview};
pub use views::{
    AllocationResultsView, AllocationRunSummary, ApplicationsOverview, AssignmentView,
    OfferingAllocationStats, OfferingDemand, SubmissionReceipt,
};
