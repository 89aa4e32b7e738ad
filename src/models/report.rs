//! Report model: one visit aggregate per visitor or invite

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::timeline::TimelineOwner;

/// Entity a report belongs to. Exactly one is ever set on a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ReportOwner {
    Visitor(i32),
    Invite(i32),
}

impl ReportOwner {
    pub fn id(&self) -> i32 {
        match self {
            ReportOwner::Visitor(id) | ReportOwner::Invite(id) => *id,
        }
    }

    pub(crate) fn column(&self) -> &'static str {
        match self {
            ReportOwner::Visitor(_) => "visitor_id",
            ReportOwner::Invite(_) => "invite_id",
        }
    }
}

impl std::fmt::Display for ReportOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportOwner::Visitor(id) => write!(f, "visitor {}", id),
            ReportOwner::Invite(id) => write!(f, "invite {}", id),
        }
    }
}

impl From<TimelineOwner> for ReportOwner {
    fn from(owner: TimelineOwner) -> Self {
        match owner {
            TimelineOwner::Visitor(id) => ReportOwner::Visitor(id),
            TimelineOwner::Invite(id) => ReportOwner::Invite(id),
        }
    }
}

/// Report row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: i32,
    pub visitor_id: Option<i32>,
    pub invite_id: Option<i32>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub visit_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// Owner of this report. Storage guarantees one owner column is set.
    pub fn owner(&self) -> Option<ReportOwner> {
        match (self.visitor_id, self.invite_id) {
            (Some(id), None) => Some(ReportOwner::Visitor(id)),
            (None, Some(id)) => Some(ReportOwner::Invite(id)),
            _ => None,
        }
    }
}

/// Contact summary of the report owner
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnerSummary {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub purpose: Option<String>,
    pub status: String,
    pub image: Option<String>,
}

/// Report with owner details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportDetails {
    pub id: i32,
    /// `{"kind": "visitor" | "invite", "id": n}`
    #[schema(value_type = Object)]
    pub owner: ReportOwner,
    pub visitor_name: String,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub visit_count: i32,
    pub owner_details: OwnerSummary,
}

/// Update report request; only remarks are editable
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReport {
    pub remarks: Option<String>,
}

/// Query parameters for report listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ReportQuery {
    /// Checked in on or after (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Checked in on or before (YYYY-MM-DD)
    pub end_date: Option<String>,
    /// Search over owner name, email and phone
    pub search: Option<String>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(visitor_id: Option<i32>, invite_id: Option<i32>) -> Report {
        let now = Utc::now();
        Report {
            id: 1,
            visitor_id,
            invite_id,
            check_in: None,
            check_out: None,
            remarks: None,
            visit_count: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn owner_is_the_single_populated_column() {
        assert_eq!(row(Some(3), None).owner(), Some(ReportOwner::Visitor(3)));
        assert_eq!(row(None, Some(9)).owner(), Some(ReportOwner::Invite(9)));
        assert_eq!(row(Some(3), Some(9)).owner(), None);
        assert_eq!(row(None, None).owner(), None);
    }

    #[test]
    fn owner_serializes_as_tagged_union() {
        let json = serde_json::to_value(ReportOwner::Invite(12)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "invite", "id": 12}));
    }
}
