//! Visitor endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        timeline::{TimelineEntry, TimelineOwner},
        visitor::{RegisterVisitor, Registration, UpdateVisitor, Visitor, VisitorQuery},
    },
};

use super::{AuthenticatedUser, MaybeUser, PaginatedResponse, Upload};

/// Status change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdate {
    /// Target status, e.g. `approved` or `checked_in`
    pub status: String,
}

/// Multipart photo upload
#[derive(ToSchema)]
pub struct ImageUpload {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Register a visitor (self-service or staff)
#[utoipa::path(
    post,
    path = "/visitors",
    tag = "visitors",
    request_body = RegisterVisitor,
    responses(
        (status = 201, description = "New visitor registered", body = Registration),
        (status = 200, description = "Returning visitor re-registered", body = Registration),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_visitor(
    State(state): State<crate::AppState>,
    MaybeUser(claims): MaybeUser,
    Json(data): Json<RegisterVisitor>,
) -> AppResult<(StatusCode, Json<Registration>)> {
    data.validate()?;
    let registration = state.services.visitors.register(&data, claims.as_ref()).await?;
    let code = if registration.returning {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((code, Json(registration)))
}

/// List visitors with filters and pagination
#[utoipa::path(
    get,
    path = "/visitors",
    tag = "visitors",
    security(("bearer_auth" = [])),
    params(VisitorQuery),
    responses(
        (status = 200, description = "Visitors list", body = super::VisitorsPage)
    )
)]
pub async fn list_visitors(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<VisitorQuery>,
) -> AppResult<Json<PaginatedResponse<Visitor>>> {
    let (visitors, total) = state.services.visitors.list(&query).await?;
    Ok(Json(PaginatedResponse::new(visitors, total, query.page, query.per_page)))
}

/// Get visitor by ID
#[utoipa::path(
    get,
    path = "/visitors/{id}",
    tag = "visitors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Visitor ID")),
    responses(
        (status = 200, description = "Visitor details", body = Visitor),
        (status = 404, description = "Visitor not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_visitor(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Visitor>> {
    let visitor = state.services.visitors.get(id).await?;
    Ok(Json(visitor))
}

/// Update visitor contact fields
#[utoipa::path(
    put,
    path = "/visitors/{id}",
    tag = "visitors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Visitor ID")),
    request_body = UpdateVisitor,
    responses(
        (status = 200, description = "Visitor updated", body = Visitor)
    )
)]
pub async fn update_visitor(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateVisitor>,
) -> AppResult<Json<Visitor>> {
    data.validate()?;
    let visitor = state.services.visitors.update(id, &data).await?;
    Ok(Json(visitor))
}

/// Delete a visitor
#[utoipa::path(
    delete,
    path = "/visitors/{id}",
    tag = "visitors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Visitor ID")),
    responses(
        (status = 204, description = "Visitor deleted"),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_visitor(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.visitors.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change a visitor's status
#[utoipa::path(
    patch,
    path = "/visitors/{id}/status",
    tag = "visitors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Visitor ID")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Visitor after the transition", body = Visitor),
        (status = 400, description = "Unknown status", body = crate::error::ErrorResponse),
        (status = 404, description = "Visitor not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_visitor_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<StatusUpdate>,
) -> AppResult<Json<Visitor>> {
    let visitor = state
        .services
        .lifecycle
        .transition_visitor(id, &data.status, Some(&claims))
        .await?;
    Ok(Json(visitor))
}

/// Upload a visitor photo
#[utoipa::path(
    post,
    path = "/visitors/{id}/capture",
    tag = "visitors",
    params(("id" = i32, Path, description = "Visitor ID")),
    request_body(content = ImageUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Photo stored", body = Visitor),
        (status = 404, description = "Visitor not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn capture_visitor_image(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<Json<Visitor>> {
    let mut upload = Upload::read(multipart).await?;
    let image = upload.require_image()?;
    let visitor = state.services.visitors.capture_image(id, image).await?;
    Ok(Json(visitor))
}

/// Status history of a visitor, newest first
#[utoipa::path(
    get,
    path = "/visitors/{id}/timeline",
    tag = "visitors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Visitor ID")),
    responses(
        (status = 200, description = "Status timeline", body = Vec<TimelineEntry>)
    )
)]
pub async fn visitor_timeline(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<TimelineEntry>>> {
    let entries = state
        .services
        .lifecycle
        .timeline(TimelineOwner::Visitor(id))
        .await?;
    Ok(Json(entries))
}
