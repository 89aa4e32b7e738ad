//! Statistics service
//!
//! Read-only queries over visitors, invites and reports. Day and hour windows
//! are computed in the configured server timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use sqlx::Row;

use crate::{
    api::stats::{
        ActiveVisit, ActiveVisitsStats, ActivityItem, AverageDurationStats, HourBucket,
        HourlyActivity, RecentActivity, ScheduledInvite, StatusDistribution, StatusShare,
        TodayScheduledStats, TotalVisitorsStats, TrendPoint, TrendsQuery, VisitorTrends,
    },
    config::VisitsConfig,
    error::{AppError, AppResult},
    repository::{day_bounds, parse_date, Repository},
};

const DEFAULT_TREND_DAYS: i64 = 7;
const MAX_TREND_DAYS: i64 = 366;
const TODAY_RECENT_INVITES: i64 = 5;
const MAX_LIST_LIMIT: i64 = 100;

/// Growth of `today` over `yesterday` as a signed percentage string.
///
/// Without a baseline the result is `+100%` when anything happened today and
/// `0%` otherwise.
pub fn growth_percentage(today: i64, yesterday: i64) -> String {
    if yesterday == 0 {
        return if today > 0 { "+100%".to_string() } else { "0%".to_string() };
    }
    let growth = (today - yesterday) as f64 / yesterday as f64 * 100.0;
    format!("{:+.1}%", growth)
}

/// `{h}h {m}m`, dropping the hour part when it is zero
pub fn format_duration_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let (hours, rest) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}h {}m", hours, rest)
    } else {
        format!("{}m", rest)
    }
}

/// Duration between two instants, formatted like [`format_duration_minutes`]
pub fn format_elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    format_duration_minutes((to - from).num_minutes())
}

/// Human-readable distance from `then` to `now`
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - then;
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    };

    if elapsed < Duration::minutes(1) {
        "just now".to_string()
    } else if elapsed < Duration::hours(1) {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed < Duration::days(1) {
        plural(elapsed.num_hours(), "hour")
    } else {
        plural(elapsed.num_days(), "day")
    }
}

/// Parse a `?limit=` value, falling back to `default` when absent or blank
pub fn resolve_limit(requested: Option<&str>, default: i64) -> AppResult<i64> {
    let limit = match requested.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| AppError::Validation(format!("limit must be a whole number, got '{}'", raw)))?,
    };
    Ok(limit.clamp(1, MAX_LIST_LIMIT))
}

/// Local calendar date of an instant
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// 24 hourly buckets of check-ins on the local day containing `now`
pub fn hourly_buckets(check_ins: &[DateTime<Utc>], tz: Tz, now: DateTime<Utc>) -> HourlyActivity {
    let today = local_date(now, tz);
    let current_hour = now.with_timezone(&tz).hour();

    let mut counts = [0i64; 24];
    for instant in check_ins {
        let local = instant.with_timezone(&tz);
        if local.date_naive() == today {
            counts[local.hour() as usize] += 1;
        }
    }

    let peak_count = counts.iter().copied().max().unwrap_or(0);
    let peak_hour = if peak_count > 0 {
        counts.iter().position(|&c| c == peak_count).map(|h| h as u32)
    } else {
        None
    };

    HourlyActivity {
        hours: counts
            .iter()
            .enumerate()
            .map(|(hour, &count)| HourBucket {
                hour: hour as u32,
                label: format!("{:02}:00", hour),
                count,
                is_current: hour as u32 == current_hour,
            })
            .collect(),
        peak_hour,
        peak_count,
        total: counts.iter().sum(),
    }
}

/// Resolve an inclusive trend range, defaulting to the trailing 7 days
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let span = Duration::days(DEFAULT_TREND_DAYS - 1);
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        (Some(s), None) => (s, today.max(s)),
        (None, Some(e)) => (e - span, e),
        (None, None) => (today - span, today),
    };

    if start > end {
        return Err(AppError::Validation(
            "start_date must not be after end_date".to_string(),
        ));
    }
    if (end - start).num_days() >= MAX_TREND_DAYS {
        return Err(AppError::Validation(format!(
            "Date range must not exceed {} days",
            MAX_TREND_DAYS
        )));
    }
    Ok((start, end))
}

/// One point per calendar day in `[start, end]`, with totals and averages
pub fn daily_series(
    start: NaiveDate,
    end: NaiveDate,
    visits: &[(NaiveDate, i64)],
    invites: &[(NaiveDate, i64)],
) -> VisitorTrends {
    let lookup = |rows: &[(NaiveDate, i64)], day: NaiveDate| {
        rows.iter()
            .filter(|(d, _)| *d == day)
            .map(|(_, c)| *c)
            .sum::<i64>()
    };

    let points: Vec<TrendPoint> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|day| TrendPoint {
            date: day,
            label: format!("{} {:02}/{:02}", day.weekday(), day.day(), day.month()),
            visits: lookup(visits, day),
            invites: lookup(invites, day),
        })
        .collect();

    let total_visits: i64 = points.iter().map(|p| p.visits).sum();
    let total_invites: i64 = points.iter().map(|p| p.invites).sum();
    let days = points.len().max(1) as f64;
    let round = |v: f64| (v * 10.0).round() / 10.0;

    VisitorTrends {
        start_date: Some(start),
        end_date: Some(end),
        total_visits,
        total_invites,
        average_visits: round(total_visits as f64 / days),
        average_invites: round(total_invites as f64 / days),
        points,
    }
}

/// Shares of checked-in, completed and scheduled visits
pub fn status_distribution(checked_in: i64, completed: i64, scheduled: i64) -> StatusDistribution {
    let total = checked_in + completed + scheduled;
    let share = |label: &str, count: i64| StatusShare {
        label: label.to_string(),
        count,
        percentage: if total == 0 {
            0.0
        } else {
            (count as f64 / total as f64 * 1000.0).round() / 10.0
        },
    };

    StatusDistribution {
        total,
        entries: vec![
            share("checked_in", checked_in),
            share("completed", completed),
            share("scheduled", scheduled),
        ],
    }
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    tz: Tz,
    recent_limit: i64,
}

impl StatsService {
    pub fn new(repository: Repository, visits: &VisitsConfig) -> Self {
        Self {
            repository,
            tz: visits.tz(),
            recent_limit: visits.recent_limit,
        }
    }

    fn limit(&self, requested: Option<&str>) -> AppResult<i64> {
        resolve_limit(requested, self.recent_limit)
    }

    fn today(&self) -> NaiveDate {
        local_date(Utc::now(), self.tz)
    }

    /// Count rows of `table` whose `column` falls within a local day
    async fn count_in_day(&self, table: &str, column: &str, day: NaiveDate) -> AppResult<i64> {
        let (start, end) = day_bounds(day, self.tz);
        let q = format!(
            "SELECT COUNT(*) FROM {} WHERE {} >= $1 AND {} < $2",
            table, column, column
        );
        let count = sqlx::query_scalar::<_, i64>(&q)
            .bind(start)
            .bind(end)
            .fetch_one(&self.repository.pool)
            .await?;
        Ok(count)
    }

    /// Report totals with today's check-ins against yesterday's
    pub async fn total_visitors(&self) -> AppResult<TotalVisitorsStats> {
        let today = self.today();
        let yesterday_date = today.pred_opt().unwrap_or(today);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.repository.pool)
            .await?;
        let today_count = self.count_in_day("reports", "check_in", today).await?;
        let yesterday = self.count_in_day("reports", "check_in", yesterday_date).await?;

        Ok(TotalVisitorsStats {
            total,
            today: today_count,
            yesterday,
            growth: growth_percentage(today_count, yesterday),
        })
    }

    /// Visits checked in and not checked out, most recent first
    pub async fn active_visits(&self, limit: Option<&str>) -> AppResult<ActiveVisitsStats> {
        let limit = self.limit(limit)?;
        let pool = &self.repository.pool;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports WHERE check_in IS NOT NULL AND check_out IS NULL",
        )
        .fetch_one(pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.check_in, r.visitor_id,
                   COALESCE(v.name, i.visitor_name) AS name
            FROM reports r
            LEFT JOIN visitors v ON v.id = r.visitor_id
            LEFT JOIN invites i ON i.id = r.invite_id
            WHERE r.check_in IS NOT NULL AND r.check_out IS NULL
            ORDER BY r.check_in DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        let now = Utc::now();
        let visits = rows
            .iter()
            .map(|row| {
                let check_in: DateTime<Utc> = row.get("check_in");
                ActiveVisit {
                    report_id: row.get("id"),
                    name: row.get::<Option<String>, _>("name").unwrap_or_default(),
                    kind: owner_kind(row.get("visitor_id")).to_string(),
                    check_in,
                    duration: format_elapsed(check_in, now),
                }
            })
            .collect();

        Ok(ActiveVisitsStats { count, visits })
    }

    /// Mean duration of completed visits
    pub async fn average_duration(&self) -> AppResult<AverageDurationStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS completed,
                   AVG(EXTRACT(EPOCH FROM (check_out - check_in)))::float8 AS avg_seconds
            FROM reports
            WHERE check_in IS NOT NULL AND check_out IS NOT NULL
            "#,
        )
        .fetch_one(&self.repository.pool)
        .await?;

        let completed: i64 = row.get("completed");
        let avg_seconds: Option<f64> = row.get("avg_seconds");
        let average_minutes = avg_seconds.map(|s| (s / 60.0).round() as i64).unwrap_or(0);

        Ok(AverageDurationStats {
            average_minutes,
            formatted: format_duration_minutes(average_minutes),
            completed_visits: completed,
        })
    }

    /// Invites created today, compared with yesterday
    pub async fn today_scheduled(&self) -> AppResult<TodayScheduledStats> {
        let today = self.today();
        let yesterday_date = today.pred_opt().unwrap_or(today);

        let today_count = self.count_in_day("invites", "created_at", today).await?;
        let yesterday = self.count_in_day("invites", "created_at", yesterday_date).await?;

        let (start, end) = day_bounds(today, self.tz);
        let rows = sqlx::query(
            r#"
            SELECT id, visitor_name, visitor_email, visit_time, status, created_at
            FROM invites
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(TODAY_RECENT_INVITES)
        .fetch_all(&self.repository.pool)
        .await?;

        let recent = rows
            .iter()
            .map(|row| ScheduledInvite {
                id: row.get("id"),
                visitor_name: row.get("visitor_name"),
                visitor_email: row.get("visitor_email"),
                visit_time: row.get("visit_time"),
                status: row.get("status"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(TodayScheduledStats {
            today: today_count,
            yesterday,
            growth: growth_percentage(today_count, yesterday),
            recent,
        })
    }

    /// Per-day check-ins and invite creations over a date range
    pub async fn visitor_trends(&self, query: &TrendsQuery) -> AppResult<VisitorTrends> {
        let (start, end) = resolve_range(
            parse_date(query.start_date.as_deref())?,
            parse_date(query.end_date.as_deref())?,
            self.today(),
        )?;
        let (from, _) = day_bounds(start, self.tz);
        let (_, to) = day_bounds(end, self.tz);

        let visits = self.daily_counts("reports", "check_in", from, to).await?;
        let invites = self.daily_counts("invites", "created_at", from, to).await?;

        Ok(daily_series(start, end, &visits, &invites))
    }

    async fn daily_counts(
        &self,
        table: &str,
        column: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<(NaiveDate, i64)>> {
        let q = format!(
            r#"
            SELECT ({col} AT TIME ZONE $1)::date AS day, COUNT(*) AS total
            FROM {table}
            WHERE {col} >= $2 AND {col} < $3
            GROUP BY day
            ORDER BY day
            "#,
            col = column,
            table = table
        );
        let rows = sqlx::query(&q)
            .bind(self.tz.name())
            .bind(from)
            .bind(to)
            .fetch_all(&self.repository.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<NaiveDate, _>("day"), row.get::<i64, _>("total")))
            .collect())
    }

    /// Today's check-ins by local hour
    pub async fn hourly_activity(&self) -> AppResult<HourlyActivity> {
        let now = Utc::now();
        let (start, end) = day_bounds(local_date(now, self.tz), self.tz);

        let check_ins: Vec<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT check_in FROM reports WHERE check_in >= $1 AND check_in < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(hourly_buckets(&check_ins, self.tz, now))
    }

    /// Today's shares of checked-in, completed and scheduled visits
    pub async fn status_distribution(&self) -> AppResult<StatusDistribution> {
        let (start, end) = day_bounds(self.today(), self.tz);

        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM reports
                  WHERE check_in >= $1 AND check_in < $2 AND check_out IS NULL) AS checked_in,
                (SELECT COUNT(*) FROM reports
                  WHERE check_out >= $1 AND check_out < $2) AS completed,
                (SELECT COUNT(*) FROM invites
                  WHERE created_at >= $1 AND created_at < $2) AS scheduled
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.repository.pool)
        .await?;

        Ok(status_distribution(
            row.get("checked_in"),
            row.get("completed"),
            row.get("scheduled"),
        ))
    }

    /// Latest check-ins and check-outs
    pub async fn recent_activity(&self, limit: Option<&str>) -> AppResult<RecentActivity> {
        let limit = self.limit(limit)?;
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.check_in, r.check_out,
                   COALESCE(v.name, i.visitor_name) AS name
            FROM reports r
            LEFT JOIN visitors v ON v.id = r.visitor_id
            LEFT JOIN invites i ON i.id = r.invite_id
            WHERE r.check_in IS NOT NULL
            ORDER BY r.check_in DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.repository.pool)
        .await?;

        let now = Utc::now();
        let items = rows
            .iter()
            .map(|row| {
                let check_in: DateTime<Utc> = row.get("check_in");
                let check_out: Option<DateTime<Utc>> = row.get("check_out");
                activity_item(
                    row.get("id"),
                    row.get::<Option<String>, _>("name").unwrap_or_default(),
                    check_in,
                    check_out,
                    now,
                )
            })
            .collect();

        Ok(RecentActivity { items })
    }
}

fn owner_kind(visitor_id: Option<i32>) -> &'static str {
    if visitor_id.is_some() {
        "visitor"
    } else {
        "invite"
    }
}

/// Feed entry for one report
pub fn activity_item(
    report_id: i32,
    name: String,
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ActivityItem {
    match check_out {
        Some(out) => ActivityItem {
            report_id,
            name,
            action: "check_out".to_string(),
            action_label: "Checked out".to_string(),
            time: out,
            time_ago: time_ago(out, now),
            duration: format_elapsed(check_in, out),
        },
        None => ActivityItem {
            report_id,
            name,
            action: "check_in".to_string(),
            action_label: "Checked in".to_string(),
            time: check_in,
            time_ago: time_ago(check_in, now),
            duration: format_elapsed(check_in, now),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn limit_parsing_clamps_and_rejects_words() {
        assert_eq!(resolve_limit(None, 10).unwrap(), 10);
        assert_eq!(resolve_limit(Some(" "), 10).unwrap(), 10);
        assert_eq!(resolve_limit(Some("3"), 10).unwrap(), 3);
        assert_eq!(resolve_limit(Some("0"), 10).unwrap(), 1);
        assert_eq!(resolve_limit(Some("5000"), 10).unwrap(), MAX_LIST_LIMIT);
        assert!(matches!(resolve_limit(Some("abc"), 10), Err(AppError::Validation(_))));
    }

    #[test]
    fn growth_percentage_cases() {
        assert_eq!(growth_percentage(0, 0), "0%");
        assert_eq!(growth_percentage(5, 0), "+100%");
        assert_eq!(growth_percentage(10, 5), "+100.0%");
        assert_eq!(growth_percentage(5, 10), "-50.0%");
        assert_eq!(growth_percentage(4, 4), "+0.0%");
    }

    #[test]
    fn durations_omit_zero_hours() {
        assert_eq!(format_duration_minutes(0), "0m");
        assert_eq!(format_duration_minutes(45), "45m");
        assert_eq!(format_duration_minutes(60), "1h 0m");
        assert_eq!(format_duration_minutes(135), "2h 15m");
        assert_eq!(format_duration_minutes(-3), "0m");
    }

    #[test]
    fn time_ago_picks_the_largest_unit() {
        let now = utc(2025, 6, 2, 12, 0);
        assert_eq!(time_ago(now - Duration::seconds(20), now), "just now");
        assert_eq!(time_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::minutes(59), now), "59 minutes ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(time_ago(now - Duration::days(1), now), "1 day ago");
    }

    #[test]
    fn day_bounds_follow_the_server_timezone() {
        let (start, end) = day_bounds(date(2025, 6, 2), chrono_tz::Asia::Kolkata);
        assert_eq!(start, utc(2025, 6, 1, 18, 30));
        assert_eq!(end, utc(2025, 6, 2, 18, 30));
    }

    #[test]
    fn day_bounds_span_dst_change() {
        // Europe/Paris springs forward on 2025-03-30
        let (start, end) = day_bounds(date(2025, 3, 30), chrono_tz::Europe::Paris);
        assert_eq!(end - start, Duration::hours(23));
    }

    #[test]
    fn hourly_buckets_count_local_hours_and_find_first_peak() {
        let tz = chrono_tz::UTC;
        let now = utc(2025, 6, 2, 14, 10);
        let check_ins = [
            utc(2025, 6, 2, 9, 5),
            utc(2025, 6, 2, 9, 40),
            utc(2025, 6, 2, 11, 0),
            utc(2025, 6, 2, 11, 30),
            utc(2025, 6, 2, 13, 0),
            utc(2025, 6, 1, 9, 0), // yesterday
        ];

        let activity = hourly_buckets(&check_ins, tz, now);
        assert_eq!(activity.hours.len(), 24);
        assert_eq!(activity.hours[9].count, 2);
        assert_eq!(activity.hours[11].count, 2);
        assert_eq!(activity.peak_hour, Some(9));
        assert_eq!(activity.peak_count, 2);
        assert_eq!(activity.total, 5);
        assert!(activity.hours[14].is_current);
        assert_eq!(activity.hours.iter().filter(|h| h.is_current).count(), 1);
        assert_eq!(activity.hours[9].label, "09:00");
    }

    #[test]
    fn no_peak_without_check_ins() {
        let activity = hourly_buckets(&[], chrono_tz::UTC, utc(2025, 6, 2, 8, 0));
        assert_eq!(activity.peak_hour, None);
        assert_eq!(activity.total, 0);
    }

    #[test]
    fn default_range_is_trailing_week() {
        let today = date(2025, 6, 10);
        assert_eq!(resolve_range(None, None, today).unwrap(), (date(2025, 6, 4), today));
        assert_eq!(
            resolve_range(Some(date(2025, 6, 1)), Some(date(2025, 6, 3)), today).unwrap(),
            (date(2025, 6, 1), date(2025, 6, 3))
        );
        assert!(resolve_range(Some(date(2025, 6, 5)), Some(date(2025, 6, 1)), today).is_err());
        assert!(resolve_range(Some(date(2023, 1, 1)), Some(date(2025, 1, 1)), today).is_err());
    }

    #[test]
    fn daily_series_fills_every_day_inclusive() {
        let visits = [(date(2025, 6, 2), 4), (date(2025, 6, 4), 2)];
        let invites = [(date(2025, 6, 3), 3)];

        let trends = daily_series(date(2025, 6, 2), date(2025, 6, 4), &visits, &invites);

        assert_eq!(trends.points.len(), 3);
        assert_eq!(trends.points[1].visits, 0);
        assert_eq!(trends.points[1].invites, 3);
        assert_eq!(trends.points[0].label, "Mon 02/06");
        assert_eq!(trends.total_visits, 6);
        assert_eq!(trends.total_invites, 3);
        assert_eq!(trends.average_visits, 2.0);
        assert_eq!(trends.average_invites, 1.0);
    }

    #[test]
    fn distribution_percentages_are_zero_without_data() {
        let empty = status_distribution(0, 0, 0);
        assert_eq!(empty.total, 0);
        assert!(empty.entries.iter().all(|e| e.percentage == 0.0));

        let dist = status_distribution(1, 1, 2);
        assert_eq!(dist.total, 4);
        assert_eq!(dist.entries[0].percentage, 25.0);
        assert_eq!(dist.entries[2].label, "scheduled");
        assert_eq!(dist.entries[2].percentage, 50.0);
    }

    #[test]
    fn activity_uses_check_out_when_visit_completed() {
        let now = utc(2025, 6, 2, 12, 0);
        let item = activity_item(1, "Jane".into(), utc(2025, 6, 2, 9, 0), Some(utc(2025, 6, 2, 10, 30)), now);
        assert_eq!(item.action, "check_out");
        assert_eq!(item.duration, "1h 30m");
        assert_eq!(item.time_ago, "1 hour ago");

        let open = activity_item(2, "Sam".into(), utc(2025, 6, 2, 11, 50), None, now);
        assert_eq!(open.action_label, "Checked in");
        assert_eq!(open.duration, "10m");
        assert_eq!(open.time_ago, "10 minutes ago");
    }
}
