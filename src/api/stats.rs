//! Dashboard statistics endpoints
//!
//! Every endpoint answers `200` with a `{success, data, error}` envelope. A
//! failing query yields `success: false`, a zeroed `data` payload and the
//! error message instead of an error status.

use axum::{extract::Query, extract::State, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Statistics response envelope
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    TotalVisitorsResponse = StatsEnvelope<TotalVisitorsStats>,
    ActiveVisitsResponse = StatsEnvelope<ActiveVisitsStats>,
    AverageDurationResponse = StatsEnvelope<AverageDurationStats>,
    TodayScheduledResponse = StatsEnvelope<TodayScheduledStats>,
    VisitorTrendsResponse = StatsEnvelope<VisitorTrends>,
    HourlyActivityResponse = StatsEnvelope<HourlyActivity>,
    StatusDistributionResponse = StatsEnvelope<StatusDistribution>,
    RecentActivityResponse = StatsEnvelope<RecentActivity>
)]
pub struct StatsEnvelope<T> {
    pub success: bool,
    pub data: T,
    pub error: Option<String>,
}

/// Wrap a statistics result, degrading failures to a default payload
pub fn envelope<T: Default>(what: &str, result: AppResult<T>) -> StatsEnvelope<T> {
    match result {
        Ok(data) => StatsEnvelope {
            success: true,
            data,
            error: None,
        },
        Err(e) => {
            tracing::error!("Statistics '{}' degraded: {}", what, e);
            StatsEnvelope {
                success: false,
                data: T::default(),
                error: Some(e.to_string()),
            }
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TotalVisitorsStats {
    /// All reports ever recorded
    pub total: i64,
    /// Check-ins today (server timezone)
    pub today: i64,
    pub yesterday: i64,
    /// Today vs yesterday, e.g. `+25.0%`
    pub growth: String,
}

impl Default for TotalVisitorsStats {
    fn default() -> Self {
        Self {
            total: 0,
            today: 0,
            yesterday: 0,
            growth: "0%".to_string(),
        }
    }
}

/// A visit that is checked in and not yet checked out
#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveVisit {
    pub report_id: i32,
    pub name: String,
    /// `visitor` or `invite`
    pub kind: String,
    pub check_in: DateTime<Utc>,
    /// Elapsed time since check-in, e.g. `1h 5m`
    pub duration: String,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ActiveVisitsStats {
    pub count: i64,
    pub visits: Vec<ActiveVisit>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AverageDurationStats {
    pub average_minutes: i64,
    /// e.g. `1h 20m`, or `0m` without completed visits
    pub formatted: String,
    pub completed_visits: i64,
}

impl Default for AverageDurationStats {
    fn default() -> Self {
        Self {
            average_minutes: 0,
            formatted: "0m".to_string(),
            completed_visits: 0,
        }
    }
}

/// Invite created today
#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduledInvite {
    pub id: i32,
    pub visitor_name: String,
    pub visitor_email: String,
    pub visit_time: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayScheduledStats {
    pub today: i64,
    pub yesterday: i64,
    pub growth: String,
    /// Most recent invites created today
    pub recent: Vec<ScheduledInvite>,
}

impl Default for TodayScheduledStats {
    fn default() -> Self {
        Self {
            today: 0,
            yesterday: 0,
            growth: "0%".to_string(),
            recent: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// Short day label, e.g. `Mon 02/06`
    pub label: String,
    pub visits: i64,
    pub invites: i64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct VisitorTrends {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub points: Vec<TrendPoint>,
    pub total_visits: i64,
    pub total_invites: i64,
    pub average_visits: f64,
    pub average_invites: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HourBucket {
    /// Hour of day, 0-23, server timezone
    pub hour: u32,
    /// e.g. `09:00`
    pub label: String,
    pub count: i64,
    pub is_current: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HourlyActivity {
    pub hours: Vec<HourBucket>,
    /// First hour reaching the highest count; absent without check-ins
    pub peak_hour: Option<u32>,
    pub peak_count: i64,
    pub total: i64,
}

/// All 24 hours with zero check-ins
impl Default for HourlyActivity {
    fn default() -> Self {
        Self {
            hours: (0..24)
                .map(|hour| HourBucket {
                    hour,
                    label: format!("{:02}:00", hour),
                    count: 0,
                    is_current: false,
                })
                .collect(),
            peak_hour: None,
            peak_count: 0,
            total: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusShare {
    /// `checked_in`, `completed` or `scheduled`
    pub label: String,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct StatusDistribution {
    pub total: i64,
    pub entries: Vec<StatusShare>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityItem {
    pub report_id: i32,
    pub name: String,
    /// `check_in` or `check_out`
    pub action: String,
    /// `Checked in` or `Checked out`
    pub action_label: String,
    pub time: DateTime<Utc>,
    /// e.g. `5 minutes ago`
    pub time_ago: String,
    /// Elapsed time for open visits, total time for completed ones
    pub duration: String,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct RecentActivity {
    pub items: Vec<ActivityItem>,
}

/// Date range for trend charts (defaults to the trailing 7 days)
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct TrendsQuery {
    /// First day (YYYY-MM-DD), inclusive
    pub start_date: Option<String>,
    /// Last day (YYYY-MM-DD), inclusive
    pub end_date: Option<String>,
}

/// Size of a list section
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LimitQuery {
    /// Number of entries (defaults to the configured recent limit).
    /// A non-numeric value degrades the envelope instead of rejecting the request.
    #[param(value_type = Option<i64>)]
    #[schema(value_type = Option<i64>)]
    pub limit: Option<String>,
}

#[utoipa::path(
    get,
    path = "/reports/stats/total-visitors",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Total and daily visitor counts", body = TotalVisitorsResponse)
    )
)]
pub async fn total_visitors(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> Json<StatsEnvelope<TotalVisitorsStats>> {
    Json(envelope(
        "total-visitors",
        state.services.stats.total_visitors().await,
    ))
}

#[utoipa::path(
    get,
    path = "/reports/stats/active-visits",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(LimitQuery),
    responses(
        (status = 200, description = "Visits currently in progress", body = ActiveVisitsResponse)
    )
)]
pub async fn active_visits(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<LimitQuery>,
) -> Json<StatsEnvelope<ActiveVisitsStats>> {
    Json(envelope(
        "active-visits",
        state.services.stats.active_visits(query.limit.as_deref()).await,
    ))
}

#[utoipa::path(
    get,
    path = "/reports/stats/average-duration",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Average completed visit duration", body = AverageDurationResponse)
    )
)]
pub async fn average_duration(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> Json<StatsEnvelope<AverageDurationStats>> {
    Json(envelope(
        "average-duration",
        state.services.stats.average_duration().await,
    ))
}

#[utoipa::path(
    get,
    path = "/reports/stats/today-scheduled",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Invites scheduled today", body = TodayScheduledResponse)
    )
)]
pub async fn today_scheduled(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> Json<StatsEnvelope<TodayScheduledStats>> {
    Json(envelope(
        "today-scheduled",
        state.services.stats.today_scheduled().await,
    ))
}

#[utoipa::path(
    get,
    path = "/reports/charts/visitor-trends",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(TrendsQuery),
    responses(
        (status = 200, description = "Daily check-ins and invites", body = VisitorTrendsResponse)
    )
)]
pub async fn visitor_trends(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<TrendsQuery>,
) -> Json<StatsEnvelope<VisitorTrends>> {
    Json(envelope(
        "visitor-trends",
        state.services.stats.visitor_trends(&query).await,
    ))
}

#[utoipa::path(
    get,
    path = "/reports/charts/todays-activity",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Today's check-ins per hour", body = HourlyActivityResponse)
    )
)]
pub async fn todays_activity(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> Json<StatsEnvelope<HourlyActivity>> {
    Json(envelope(
        "todays-activity",
        state.services.stats.hourly_activity().await,
    ))
}

#[utoipa::path(
    get,
    path = "/reports/charts/status-distribution",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Today's visit status shares", body = StatusDistributionResponse)
    )
)]
pub async fn status_distribution(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> Json<StatsEnvelope<StatusDistribution>> {
    Json(envelope(
        "status-distribution",
        state.services.stats.status_distribution().await,
    ))
}

#[utoipa::path(
    get,
    path = "/reports/activity/recent",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(LimitQuery),
    responses(
        (status = 200, description = "Latest check-ins and check-outs", body = RecentActivityResponse)
    )
)]
pub async fn recent_activity(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<LimitQuery>,
) -> Json<StatsEnvelope<RecentActivity>> {
    Json(envelope(
        "recent-activity",
        state.services.stats.recent_activity(query.limit.as_deref()).await,
    ))
}
