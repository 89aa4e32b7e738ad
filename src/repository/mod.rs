//! Repository layer for database operations

pub mod employees;
pub mod invites;
pub mod qr_codes;
pub mod reports;
pub mod timeline;
pub mod users;
pub mod visitors;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use sqlx::{Pool, Postgres};

use crate::error::{AppError, AppResult};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub visitors: visitors::VisitorsRepository,
    pub invites: invites::InvitesRepository,
    pub timeline: timeline::TimelineRepository,
    pub reports: reports::ReportsRepository,
    pub users: users::UsersRepository,
    pub employees: employees::EmployeesRepository,
    pub qr_codes: qr_codes::QrCodesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            visitors: visitors::VisitorsRepository::new(pool.clone()),
            invites: invites::InvitesRepository::new(pool.clone()),
            timeline: timeline::TimelineRepository::new(pool.clone()),
            reports: reports::ReportsRepository::new(pool.clone()),
            users: users::UsersRepository::new(),
            employees: employees::EmployeesRepository::new(pool.clone()),
            qr_codes: qr_codes::QrCodesRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Clamp pagination parameters; returns `(limit, offset)`
pub(crate) fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 200);
    (per_page, (page - 1) * per_page)
}

/// Parse an optional `YYYY-MM-DD` filter value
pub(crate) fn parse_date(value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", s)))
        })
        .transpose()
}

/// UTC instant of local midnight starting `date`
fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        // Midnight skipped by a DST jump
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        .with_timezone(&Utc)
}

/// `[midnight, next midnight)` of a local calendar day, as UTC instants
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.succ_opt().unwrap_or(date);
    (local_midnight(date, tz), local_midnight(next, tz))
}

/// Instant window covering the local days `start..=end`; either side may be open
pub(crate) fn local_day_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    tz: Tz,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (
        start.map(|d| day_bounds(d, tz).0),
        end.map(|d| day_bounds(d, tz).1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_clamps_out_of_range_values() {
        assert_eq!(page_bounds(None, None), (20, 0));
        assert_eq!(page_bounds(Some(0), Some(1000)), (200, 0));
        assert_eq!(page_bounds(Some(3), Some(10)), (10, 20));
    }

    #[test]
    fn blank_dates_are_ignored_and_bad_dates_rejected() {
        assert_eq!(parse_date(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_date(Some("2025-03-09")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 9)
        );
        assert!(matches!(parse_date(Some("09/03/2025")), Err(AppError::Validation(_))));
    }

    #[test]
    fn date_filters_cover_whole_local_days() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 2);
        let (from, to) = local_day_window(day, day, chrono_tz::Asia::Kolkata);
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).single());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 6, 2, 18, 30, 0).single());

        assert_eq!(local_day_window(None, None, chrono_tz::UTC), (None, None));
    }
}
