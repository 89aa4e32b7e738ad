//! Standalone code images generated by staff

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// `#rrggbb`
pub static HEX_COLOUR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid colour regex"));

/// One of the four standard error correction levels
pub static ECC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[LMQHlmqh]$").expect("valid ecc regex"));

/// Generated code row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct QrCode {
    pub id: i32,
    /// Encoded text or URL
    pub text: String,
    /// URL of the rendered image
    pub image: String,
    pub size: i32,
    pub error_correction: String,
    pub background: String,
    pub foreground: String,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
}

/// Generate a code image. Every field is optional; `data` defaults to the
/// self-registration page of the frontend.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateQrCode {
    #[validate(length(min = 1, max = 2000, message = "data must be 1 to 2000 characters"))]
    pub data: Option<String>,
    #[validate(range(min = 64, max = 1000, message = "size must be between 64 and 1000"))]
    pub size: Option<i32>,
    #[validate(regex(path = *ECC_RE, message = "error_correction must be one of L, M, Q, H"))]
    pub error_correction: Option<String>,
    #[validate(regex(path = *HEX_COLOUR_RE, message = "background must be #rrggbb"))]
    pub background: Option<String>,
    #[validate(regex(path = *HEX_COLOUR_RE, message = "foreground must be #rrggbb"))]
    pub foreground: Option<String>,
}
