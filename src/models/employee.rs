//! Staff employee profiles

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::visitor::PHONE_RE;

/// Employee profile joined with its user account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Employee {
    pub id: i32,
    pub user_id: i32,
    pub email: String,
    pub name: String,
    pub role: String,
    pub designation: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub joined_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create the profile of a staff account issued by the identity provider
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEmployee {
    /// Identity-provider user id
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub user_id: i32,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Designation is required"))]
    pub designation: String,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number"))]
    pub phone: Option<String>,
}

/// Update profile fields
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEmployee {
    #[validate(length(min = 1, max = 100))]
    pub designation: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number"))]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

/// Query parameters for employee listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    /// Filter by department (exact, case-insensitive)
    pub department: Option<String>,
    /// Filter by active flag
    pub is_active: Option<bool>,
    /// Free-text search over name, email and designation
    pub search: Option<String>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}
