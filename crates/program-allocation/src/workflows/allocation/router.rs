use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicantSubmission, AssignmentId, NewOffering, OfferingId};
use super::engine::AllocationError;
use super::ledger::VerificationError;
use super::reallocation::ReassignError;
use super::report::ExportError;
use super::repository::{AllocationStore, RepositoryError};
use super::service::{AllocationService, AllocationServiceError, CatalogError};

/// Body accepted by the manual reassignment endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReassignRequest {
    pub program_id: OfferingId,
}

/// Router builder exposing catalog, intake, allocation, and export endpoints.
pub fn allocation_router<S>(service: Arc<AllocationService<S>>) -> Router
where
    S: AllocationStore + 'static,
{
    Router::new()
        .route(
            "/api/programs",
            get(list_programs_handler::<S>).post(create_program_handler::<S>),
        )
        .route("/api/programs/:program_id", delete(delete_program_handler::<S>))
        .route(
            "/api/applications",
            get(applications_handler::<S>).post(submit_handler::<S>),
        )
        .route("/api/allocate", post(allocate_handler::<S>))
        .route("/api/allocate/results", get(results_handler::<S>))
        .route("/api/allocate/export", get(export_handler::<S>))
        .route("/api/allocate/:assignment_id", patch(reassign_handler::<S>))
        .with_state(service)
}

pub(crate) async fn list_programs_handler<S>(
    State(service): State<Arc<AllocationService<S>>>,
) -> Response
where
    S: AllocationStore + 'static,
{
    match service.list_offerings() {
        Ok(offerings) => (StatusCode::OK, Json(offerings)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_program_handler<S>(
    State(service): State<Arc<AllocationService<S>>>,
    Json(offering): Json<NewOffering>,
) -> Response
where
    S: AllocationStore + 'static,
{
    match service.create_offering(offering) {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_program_handler<S>(
    State(service): State<Arc<AllocationService<S>>>,
    Path(program_id): Path<String>,
) -> Response
where
    S: AllocationStore + 'static,
{
    let program_id = match parse_path_id(&program_id, "program id") {
        Ok(id) => OfferingId(id),
        Err(rejection) => return rejection,
    };

    match service.delete_offering(program_id) {
        Ok(removed) => {
            let payload = json!({
                "message": "program deleted",
                "program_id": removed.id,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<AllocationService<S>>>,
    Json(submission): Json<ApplicantSubmission>,
) -> Response
where
    S: AllocationStore + 'static,
{
    match service.submit(submission) {
        Ok(receipt) => {
            let status = if receipt.is_resubmission {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, Json(receipt)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn applications_handler<S>(
    State(service): State<Arc<AllocationService<S>>>,
) -> Response
where
    S: AllocationStore + 'static,
{
    match service.applications_overview() {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn allocate_handler<S>(
    State(service): State<Arc<AllocationService<S>>>,
) -> Response
where
    S: AllocationStore + 'static,
{
    match service.allocate() {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn results_handler<S>(State(service): State<Arc<AllocationService<S>>>) -> Response
where
    S: AllocationStore + 'static,
{
    match service.results() {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reassign_handler<S>(
    State(service): State<Arc<AllocationService<S>>>,
    Path(assignment_id): Path<String>,
    Json(request): Json<ReassignRequest>,
) -> Response
where
    S: AllocationStore + 'static,
{
    let assignment_id = match parse_path_id(&assignment_id, "assignment id") {
        Ok(id) => AssignmentId(id),
        Err(rejection) => return rejection,
    };

    match service.reassign(assignment_id, request.program_id) {
        Ok(reassignment) => {
            let payload = json!({
                "message": "assignment updated",
                "assignment": reassignment.assignment,
                "changes": {
                    "from": reassignment.from,
                    "to": reassignment.to,
                },
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<S>(State(service): State<Arc<AllocationService<S>>>) -> Response
where
    S: AllocationStore + 'static,
{
    match service.export_csv() {
        Ok(export) => {
            let disposition = format!("attachment; filename=\"{}\"", export.filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                export.body,
            )
                .into_response()
        }
        Err(error) => error_response(error),
    }
}

/// Numeric path segment, or a 400 carrying the same JSON `error` body as service failures.
fn parse_path_id(raw: &str, label: &str) -> Result<u64, Response> {
    raw.trim().parse::<u64>().map_err(|_| {
        let payload = json!({
            "error": format!("invalid {label} '{raw}'"),
        });
        (StatusCode::BAD_REQUEST, Json(payload)).into_response()
    })
}

/// Map service failures onto status codes with a JSON `error` body.
pub(crate) fn error_response(error: AllocationServiceError) -> Response {
    let status = match &error {
        AllocationServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        AllocationServiceError::Verification(VerificationError::MissingVerificationFields) => {
            let payload = json!({
                "error": error.to_string(),
                "requires_additional_info": true,
            });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
        AllocationServiceError::Verification(VerificationError::IdentityMismatch { .. }) => {
            StatusCode::FORBIDDEN
        }
        AllocationServiceError::Allocation(AllocationError::NoApplicants) => {
            StatusCode::BAD_REQUEST
        }
        AllocationServiceError::Reassign(
            ReassignError::AssignmentNotFound(_) | ReassignError::OfferingNotFound(_),
        ) => StatusCode::NOT_FOUND,
        AllocationServiceError::Reassign(
            ReassignError::SameOffering(_) | ReassignError::CapacityExceeded { .. },
        ) => StatusCode::BAD_REQUEST,
        AllocationServiceError::Catalog(CatalogError::OfferingNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        AllocationServiceError::Catalog(CatalogError::OfferingInUse { .. }) => StatusCode::CONFLICT,
        AllocationServiceError::Export(ExportError::NoAssignments) => StatusCode::NOT_FOUND,
        AllocationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AllocationServiceError::Export(_) | AllocationServiceError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
