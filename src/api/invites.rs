//! Invite endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        invite::{CreateInvite, Invite, InviteQuery, ReinviteRequest, UpdateInvite, VerifyInviteRequest},
        timeline::{TimelineEntry, TimelineOwner},
    },
};

use super::{visitors::StatusUpdate, AuthenticatedUser, PaginatedResponse, Upload};

/// Multipart guest capture
#[derive(ToSchema)]
pub struct InviteCaptureUpload {
    pub invite_code: String,
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Issue an invite
#[utoipa::path(
    post,
    path = "/invites",
    tag = "invites",
    security(("bearer_auth" = [])),
    request_body = CreateInvite,
    responses(
        (status = 201, description = "Invite issued", body = Invite),
        (status = 409, description = "An invite already exists for this email", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_invite(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateInvite>,
) -> AppResult<(StatusCode, Json<Invite>)> {
    data.validate()?;
    let invite = state.services.invites.create(&data, &claims).await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

/// List invites with filters and pagination
#[utoipa::path(
    get,
    path = "/invites",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(InviteQuery),
    responses(
        (status = 200, description = "Invites list", body = super::InvitesPage)
    )
)]
pub async fn list_invites(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<InviteQuery>,
) -> AppResult<Json<PaginatedResponse<Invite>>> {
    let (invites, total) = state.services.invites.list(&query).await?;
    Ok(Json(PaginatedResponse::new(invites, total, query.page, query.per_page)))
}

/// Get invite by ID
#[utoipa::path(
    get,
    path = "/invites/{id}",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Invite ID")),
    responses(
        (status = 200, description = "Invite details", body = Invite),
        (status = 404, description = "Invite not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_invite(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Invite>> {
    let invite = state.services.invites.get(id).await?;
    Ok(Json(invite))
}

/// Get invite by code
#[utoipa::path(
    get,
    path = "/invites/code/{code}",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "Invite code")),
    responses(
        (status = 200, description = "Invite details", body = Invite),
        (status = 404, description = "Unknown code", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_invite_by_code(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<Invite>> {
    let invite = state.services.invites.get_by_code(&code).await?;
    Ok(Json(invite))
}

/// Update invite contact fields and visit window
#[utoipa::path(
    put,
    path = "/invites/{id}",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Invite ID")),
    request_body = UpdateInvite,
    responses(
        (status = 200, description = "Invite updated", body = Invite)
    )
)]
pub async fn update_invite(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateInvite>,
) -> AppResult<Json<Invite>> {
    data.validate()?;
    let invite = state.services.invites.update(id, &data).await?;
    Ok(Json(invite))
}

/// Delete an invite
#[utoipa::path(
    delete,
    path = "/invites/{id}",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Invite ID")),
    responses(
        (status = 204, description = "Invite deleted"),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_invite(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.invites.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change an invite's status
#[utoipa::path(
    patch,
    path = "/invites/{id}/status",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Invite ID")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Invite after the transition", body = Invite),
        (status = 400, description = "Unknown status", body = crate::error::ErrorResponse),
        (status = 404, description = "Invite not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_invite_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<StatusUpdate>,
) -> AppResult<Json<Invite>> {
    let invite = state
        .services
        .lifecycle
        .transition_invite(id, &data.status, Some(&claims))
        .await?;
    Ok(Json(invite))
}

/// Reissue an invite with a fresh code
#[utoipa::path(
    post,
    path = "/invites/{id}/reinvite",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Invite ID")),
    request_body(content = ReinviteRequest, description = "Optional new visit window"),
    responses(
        (status = 200, description = "Invite reissued", body = Invite)
    )
)]
pub async fn reinvite(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    body: Option<Json<ReinviteRequest>>,
) -> AppResult<Json<Invite>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let invite = state.services.invites.reinvite(id, &claims, &request).await?;
    Ok(Json(invite))
}

/// Check an invite code before capture
#[utoipa::path(
    post,
    path = "/invites/verify",
    tag = "invites",
    request_body = VerifyInviteRequest,
    responses(
        (status = 200, description = "Invite is usable", body = Invite),
        (status = 404, description = "Unknown code", body = crate::error::ErrorResponse),
        (status = 410, description = "Invite expired", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_invite(
    State(state): State<crate::AppState>,
    Json(data): Json<VerifyInviteRequest>,
) -> AppResult<Json<Invite>> {
    let invite = state.services.invites.verify(data.invite_code.trim()).await?;
    Ok(Json(invite))
}

/// Guest photo capture for an invite
#[utoipa::path(
    post,
    path = "/invites/capture",
    tag = "invites",
    request_body(content = InviteCaptureUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Photo stored, invite pending review", body = Invite),
        (status = 410, description = "Invite expired", body = crate::error::ErrorResponse)
    )
)]
pub async fn capture_invite(
    State(state): State<crate::AppState>,
    multipart: Multipart,
) -> AppResult<Json<Invite>> {
    let mut upload = Upload::read(multipart).await?;
    let code = upload
        .invite_code
        .take()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("invite_code is required".to_string()))?;
    let image = upload.require_image()?;

    let invite = state.services.invites.capture(&code, image).await?;
    Ok(Json(invite))
}

/// Status history of an invite, newest first
#[utoipa::path(
    get,
    path = "/invites/{id}/timeline",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Invite ID")),
    responses(
        (status = 200, description = "Status timeline", body = Vec<TimelineEntry>)
    )
)]
pub async fn invite_timeline(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<TimelineEntry>>> {
    let entries = state
        .services
        .lifecycle
        .timeline(TimelineOwner::Invite(id))
        .await?;
    Ok(Json(entries))
}
