//! API handlers for Gatepass REST endpoints

pub mod employees;
pub mod health;
pub mod invites;
pub mod openapi;
pub mod qr_codes;
pub mod reports;
pub mod stats;
pub mod visitors;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, patch, post},
    Router,
};
use axum_extra::{
    extract::Multipart,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated staff from a bearer JWT
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Err(AppError::Authentication("Missing authorization header".to_string()));
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Optional staff identity for self-service endpoints.
///
/// No header means an anonymous caller; a header that fails validation is
/// still rejected.
pub struct MaybeUser(pub Option<UserClaims>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(MaybeUser(None));
        }
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        Ok(MaybeUser(Some(claims)))
    }
}

/// Paginated list response
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    VisitorsPage = PaginatedResponse<crate::models::Visitor>,
    InvitesPage = PaginatedResponse<crate::models::Invite>,
    ReportsPage = PaginatedResponse<crate::models::ReportDetails>,
    EmployeesPage = PaginatedResponse<crate::models::Employee>
)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, per_page: Option<i64>) -> Self {
        let (limit, offset) = crate::repository::page_bounds(page, per_page);
        Self {
            items,
            total,
            page: offset / limit + 1,
            per_page: limit,
        }
    }
}

/// Text and file parts of a multipart upload
#[derive(Debug, Default)]
pub(crate) struct Upload {
    pub image: Option<Vec<u8>>,
    pub invite_code: Option<String>,
}

impl Upload {
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut upload = Upload::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
        {
            match field.name() {
                Some("image") => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid image part: {}", e)))?;
                    upload.image = Some(bytes.to_vec());
                }
                Some("invite_code") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid invite_code part: {}", e)))?;
                    upload.invite_code = Some(text.trim().to_string());
                }
                _ => {}
            }
        }
        Ok(upload)
    }

    pub(crate) fn require_image(&mut self) -> Result<Vec<u8>, AppError> {
        match self.image.take() {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(AppError::Validation("An image file is required".to_string())),
        }
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let media = ServeDir::new(&state.config.storage.media_root);

    let api_v1 = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Visitors
        .route("/visitors", get(visitors::list_visitors).post(visitors::register_visitor))
        .route(
            "/visitors/:id",
            get(visitors::get_visitor)
                .put(visitors::update_visitor)
                .delete(visitors::delete_visitor),
        )
        .route("/visitors/:id/status", patch(visitors::update_visitor_status))
        .route("/visitors/:id/capture", post(visitors::capture_visitor_image))
        .route("/visitors/:id/timeline", get(visitors::visitor_timeline))
        // Invites
        .route("/invites", get(invites::list_invites).post(invites::create_invite))
        .route("/invites/verify", post(invites::verify_invite))
        .route("/invites/capture", post(invites::capture_invite))
        .route("/invites/code/:code", get(invites::get_invite_by_code))
        .route(
            "/invites/:id",
            get(invites::get_invite)
                .put(invites::update_invite)
                .delete(invites::delete_invite),
        )
        .route("/invites/:id/status", patch(invites::update_invite_status))
        .route("/invites/:id/reinvite", post(invites::reinvite))
        .route("/invites/:id/timeline", get(invites::invite_timeline))
        // Reports
        .route("/reports", get(reports::list_reports))
        .route(
            "/reports/:id",
            get(reports::get_report)
                .put(reports::update_report)
                .delete(reports::delete_report),
        )
        // Statistics
        .route("/reports/stats/total-visitors", get(stats::total_visitors))
        .route("/reports/stats/active-visits", get(stats::active_visits))
        .route("/reports/stats/average-duration", get(stats::average_duration))
        .route("/reports/stats/today-scheduled", get(stats::today_scheduled))
        .route("/reports/charts/visitor-trends", get(stats::visitor_trends))
        .route("/reports/charts/todays-activity", get(stats::todays_activity))
        .route("/reports/charts/status-distribution", get(stats::status_distribution))
        .route("/reports/activity/recent", get(stats::recent_activity))
        // Employees
        .route("/employees", get(employees::list_employees).post(employees::create_employee))
        .route(
            "/employees/:id",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        )
        // Code images
        .route("/qr/codes", get(qr_codes::list_qr_codes).post(qr_codes::create_qr_code))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .nest_service("/media", media)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
