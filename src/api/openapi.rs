//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{employees, health, invites, qr_codes, reports, stats, visitors};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatepass API",
        version = "1.0.0",
        description = "Visitor and invite management REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&BearerAuth),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Visitors
        visitors::register_visitor,
        visitors::list_visitors,
        visitors::get_visitor,
        visitors::update_visitor,
        visitors::delete_visitor,
        visitors::update_visitor_status,
        visitors::capture_visitor_image,
        visitors::visitor_timeline,
        // Invites
        invites::create_invite,
        invites::list_invites,
        invites::get_invite,
        invites::get_invite_by_code,
        invites::update_invite,
        invites::delete_invite,
        invites::update_invite_status,
        invites::reinvite,
        invites::verify_invite,
        invites::capture_invite,
        invites::invite_timeline,
        // Reports
        reports::list_reports,
        reports::get_report,
        reports::update_report,
        reports::delete_report,
        // Stats
        stats::total_visitors,
        stats::active_visits,
        stats::average_duration,
        stats::today_scheduled,
        stats::visitor_trends,
        stats::todays_activity,
        stats::status_distribution,
        stats::recent_activity,
        // Employees
        employees::list_employees,
        employees::create_employee,
        employees::get_employee,
        employees::update_employee,
        employees::delete_employee,
        // Code images
        qr_codes::list_qr_codes,
        qr_codes::create_qr_code,
    ),
    components(
        schemas(
            // Visitors
            crate::models::visitor::Visitor,
            crate::models::visitor::RegisterVisitor,
            crate::models::visitor::UpdateVisitor,
            crate::models::visitor::Registration,
            crate::models::status::VisitorStatus,
            visitors::StatusUpdate,
            visitors::ImageUpload,
            // Invites
            crate::models::invite::Invite,
            crate::models::invite::CreateInvite,
            crate::models::invite::UpdateInvite,
            crate::models::invite::ReinviteRequest,
            crate::models::invite::VerifyInviteRequest,
            crate::models::status::InviteStatus,
            invites::InviteCaptureUpload,
            // Timeline
            crate::models::timeline::TimelineEntry,
            // Reports
            crate::models::report::ReportDetails,
            crate::models::report::OwnerSummary,
            crate::models::report::UpdateReport,
            super::VisitorsPage,
            super::InvitesPage,
            super::ReportsPage,
            // Stats
            stats::TotalVisitorsResponse,
            stats::ActiveVisitsResponse,
            stats::AverageDurationResponse,
            stats::TodayScheduledResponse,
            stats::VisitorTrendsResponse,
            stats::HourlyActivityResponse,
            stats::StatusDistributionResponse,
            stats::RecentActivityResponse,
            stats::TotalVisitorsStats,
            stats::ActiveVisit,
            stats::ActiveVisitsStats,
            stats::AverageDurationStats,
            stats::ScheduledInvite,
            stats::TodayScheduledStats,
            stats::TrendPoint,
            stats::VisitorTrends,
            stats::HourBucket,
            stats::HourlyActivity,
            stats::StatusShare,
            stats::StatusDistribution,
            stats::ActivityItem,
            stats::RecentActivity,
            // Employees
            crate::models::employee::Employee,
            crate::models::employee::CreateEmployee,
            crate::models::employee::UpdateEmployee,
            super::EmployeesPage,
            // Code images
            crate::models::qr_code::QrCode,
            crate::models::qr_code::CreateQrCode,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "visitors", description = "Visitor registration and lifecycle"),
        (name = "invites", description = "Invite issuance and guest capture"),
        (name = "reports", description = "Visit reports"),
        (name = "stats", description = "Dashboard statistics"),
        (name = "employees", description = "Employee profiles"),
        (name = "qr", description = "Generated code images")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
