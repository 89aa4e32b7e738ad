//! Visitor model and related types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::status::VisitorStatus;

/// Digits with optional leading `+`, spaces and dashes, 7 to 20 characters
pub static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,18}[0-9]$").expect("valid phone regex"));

/// Visitor record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Visitor {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub purpose: Option<String>,
    /// URL of the captured photo
    pub image: Option<String>,
    /// URL of the pass issued at capture, attached to the check-in email
    pub pass_image: Option<String>,
    pub status: VisitorStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Staff member who registered the visitor (none for self-registration)
    pub issued_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Visitor registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterVisitor {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number"))]
    pub phone: String,
    pub company: Option<String>,
    pub purpose: Option<String>,
}

/// Update visitor contact fields (status is changed through the status endpoint only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVisitor {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number"))]
    pub phone: Option<String>,
    pub company: Option<String>,
    pub purpose: Option<String>,
}

/// Outcome of a registration: a new visitor or a returning one
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Registration {
    pub visitor: Visitor,
    /// True when the email matched an existing visitor
    pub returning: bool,
}

/// Query parameters for visitor listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct VisitorQuery {
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
