//! Status timeline entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Entity owning a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineOwner {
    Visitor(i32),
    Invite(i32),
}

impl TimelineOwner {
    pub fn id(&self) -> i32 {
        match self {
            TimelineOwner::Visitor(id) | TimelineOwner::Invite(id) => *id,
        }
    }

    pub(crate) fn table(&self) -> &'static str {
        match self {
            TimelineOwner::Visitor(_) => "visitor_status_timeline",
            TimelineOwner::Invite(_) => "invite_status_timeline",
        }
    }

    pub(crate) fn owner_column(&self) -> &'static str {
        match self {
            TimelineOwner::Visitor(_) => "visitor_id",
            TimelineOwner::Invite(_) => "invite_id",
        }
    }
}

/// One row of a visitor's or invite's status history
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TimelineEntry {
    pub id: i64,
    /// Status after the change
    pub status: String,
    /// Staff member who made the change (none for self-service flows)
    pub updated_by: Option<i32>,
    /// Display name of `updated_by`
    pub updated_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
