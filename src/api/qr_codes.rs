//! Code image generator endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::qr_code::{CreateQrCode, QrCode},
};

use super::AuthenticatedUser;

/// List the caller's generated codes
#[utoipa::path(
    get,
    path = "/qr/codes",
    tag = "qr",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Generated codes, newest first", body = Vec<QrCode>)
    )
)]
pub async fn list_qr_codes(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<QrCode>>> {
    let codes = state.services.qr_codes.list(&claims).await?;
    Ok(Json(codes))
}

/// Generate a code image
#[utoipa::path(
    post,
    path = "/qr/codes",
    tag = "qr",
    security(("bearer_auth" = [])),
    request_body = CreateQrCode,
    responses(
        (status = 201, description = "Code generated", body = QrCode),
        (status = 400, description = "Invalid options", body = crate::error::ErrorResponse),
        (status = 502, description = "Renderer or storage failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_qr_code(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateQrCode>,
) -> AppResult<(StatusCode, Json<QrCode>)> {
    data.validate()?;
    let code = state.services.qr_codes.create(&data, &claims).await?;
    Ok((StatusCode::CREATED, Json(code)))
}
