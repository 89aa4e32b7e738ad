//! Report endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::report::{ReportDetails, ReportQuery, UpdateReport},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List reports with owner details
#[utoipa::path(
    get,
    path = "/reports",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportQuery),
    responses(
        (status = 200, description = "Reports list", body = super::ReportsPage)
    )
)]
pub async fn list_reports(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<PaginatedResponse<ReportDetails>>> {
    let (reports, total) = state.services.reports.list(&query).await?;
    Ok(Json(PaginatedResponse::new(reports, total, query.page, query.per_page)))
}

/// Get report by ID
#[utoipa::path(
    get,
    path = "/reports/{id}",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report details", body = ReportDetails),
        (status = 404, description = "Report not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReportDetails>> {
    let report = state.services.reports.get(id).await?;
    Ok(Json(report))
}

/// Update report remarks
#[utoipa::path(
    put,
    path = "/reports/{id}",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = UpdateReport,
    responses(
        (status = 200, description = "Report updated", body = ReportDetails)
    )
)]
pub async fn update_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateReport>,
) -> AppResult<Json<ReportDetails>> {
    let report = state.services.reports.update(id, &data).await?;
    Ok(Json(report))
}

/// Delete a report
#[utoipa::path(
    delete,
    path = "/reports/{id}",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.reports.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
