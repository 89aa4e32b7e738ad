//! Invite model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::status::InviteStatus;
use super::visitor::PHONE_RE;

/// Invite record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invite {
    pub id: i32,
    /// Staff member who issued the invite
    pub invited_by: i32,
    pub visitor_name: String,
    pub visitor_email: String,
    pub visitor_phone: Option<String>,
    pub purpose: Option<String>,
    pub visit_time: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
    /// Short code handed to the guest; reissued on reinvite
    pub invite_code: String,
    pub status: InviteStatus,
    /// Captured guest photo
    pub image: Option<String>,
    /// Code image encoding the invite
    pub qr_code: Option<String>,
    /// Pass image issued after capture
    pub pass_image: Option<String>,
    pub check_in: Option<DateTime<Utc>>,
    pub checked_out: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invite {
    /// An invite is expired once its expiry time has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time < now
    }
}

/// Create invite request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvite {
    #[validate(length(min = 1, max = 100, message = "Visitor name is required"))]
    pub visitor_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub visitor_email: String,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number"))]
    pub visitor_phone: Option<String>,
    pub purpose: Option<String>,
    pub visit_time: DateTime<Utc>,
    /// Defaults to visit_time plus the configured validity window
    pub expiry_time: Option<DateTime<Utc>>,
}

/// Update invite details (status is changed through the status endpoint only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateInvite {
    #[validate(length(min = 1, max = 100))]
    pub visitor_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub visitor_email: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number"))]
    pub visitor_phone: Option<String>,
    pub purpose: Option<String>,
    pub visit_time: Option<DateTime<Utc>>,
    pub expiry_time: Option<DateTime<Utc>>,
}

/// Reinvite request: optionally move the visit window
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReinviteRequest {
    pub visit_time: Option<DateTime<Utc>>,
    pub expiry_time: Option<DateTime<Utc>>,
}

/// Verify invite request
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyInviteRequest {
    pub invite_code: String,
}

/// Query parameters for invite listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct InviteQuery {
    /// Filter by status
    pub status: Option<String>,
    /// Created on or after (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Created on or before (YYYY-MM-DD)
    pub end_date: Option<String>,
    /// Free-text search over name, email, phone and purpose
    pub search: Option<String>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}
