//! Reports repository for database operations

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::{postgres::PgRow, PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::report::{OwnerSummary, Report, ReportDetails, ReportOwner, ReportQuery},
};

use super::{local_day_window, page_bounds, parse_date};

/// Report columns joined with the contact fields of whichever entity owns the row
const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.visitor_id, r.invite_id, r.check_in, r.check_out, r.remarks, r.visit_count,
           COALESCE(v.name, i.visitor_name) AS owner_name,
           COALESCE(v.email, i.visitor_email) AS owner_email,
           COALESCE(v.phone, i.visitor_phone) AS owner_phone,
           COALESCE(v.purpose, i.purpose) AS owner_purpose,
           COALESCE(v.status, i.status) AS owner_status,
           COALESCE(v.image, i.image) AS owner_image
    FROM reports r
    LEFT JOIN visitors v ON v.id = r.visitor_id
    LEFT JOIN invites i ON i.id = r.invite_id
"#;

#[derive(Clone)]
pub struct ReportsRepository {
    pool: Pool<Postgres>,
}

impl ReportsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Lock the report of an owner, if one exists
    pub async fn lock_by_owner(
        &self,
        conn: &mut PgConnection,
        owner: ReportOwner,
    ) -> AppResult<Option<Report>> {
        let q = format!("SELECT * FROM reports WHERE {} = $1 FOR UPDATE", owner.column());
        let report = sqlx::query_as::<_, Report>(&q)
            .bind(owner.id())
            .fetch_optional(conn)
            .await?;
        Ok(report)
    }

    /// Get the report of an owner without locking
    pub async fn get_by_owner(&self, owner: ReportOwner) -> AppResult<Option<Report>> {
        let q = format!("SELECT * FROM reports WHERE {} = $1", owner.column());
        let report = sqlx::query_as::<_, Report>(&q)
            .bind(owner.id())
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    /// Insert the first report of an owner.
    ///
    /// A second row for the same owner is rejected by the unique constraints
    /// and surfaces as [`AppError::DuplicateReport`].
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        owner: ReportOwner,
        check_in: Option<DateTime<Utc>>,
    ) -> AppResult<Report> {
        let q = format!(
            "INSERT INTO reports ({}, check_in, visit_count) VALUES ($1, $2, 1) RETURNING *",
            owner.column()
        );
        sqlx::query_as::<_, Report>(&q)
            .bind(owner.id())
            .bind(check_in)
            .fetch_one(conn)
            .await
            .map_err(|e| AppError::from_unique_violation(e, &owner.to_string()))
    }

    /// Overwrite the visit-cycle fields of a report
    pub async fn update_cycle(
        &self,
        conn: &mut PgConnection,
        id: i32,
        visit_count: i32,
        check_in: Option<DateTime<Utc>>,
        check_out: Option<DateTime<Utc>>,
    ) -> AppResult<Report> {
        let row = sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports
            SET visit_count = $2, check_in = $3, check_out = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(visit_count)
        .bind(check_in)
        .bind(check_out)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// List reports with owner details, filtered by check-in date and search
    pub async fn list(&self, query: &ReportQuery, tz: Tz) -> AppResult<(Vec<ReportDetails>, i64)> {
        let (per_page, offset) = page_bounds(query.page, query.per_page);

        let (start, end) = local_day_window(
            parse_date(query.start_date.as_deref())?,
            parse_date(query.end_date.as_deref())?,
            tz,
        );
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let mut conditions = Vec::new();
        let mut idx = 1;

        if start.is_some() {
            conditions.push(format!("r.check_in >= ${}", idx));
            idx += 1;
        }
        if end.is_some() {
            conditions.push(format!("r.check_in < ${}", idx));
            idx += 1;
        }
        if search.is_some() {
            conditions.push(format!(
                "(COALESCE(v.name, i.visitor_name) ILIKE ${0} \
                 OR COALESCE(v.email, i.visitor_email) ILIKE ${0} \
                 OR COALESCE(v.phone, i.visitor_phone) ILIKE ${0})",
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!(
            r#"SELECT COUNT(*) FROM reports r
               LEFT JOIN visitors v ON v.id = r.visitor_id
               LEFT JOIN invites i ON i.id = r.invite_id
               {}"#,
            where_clause
        );
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(sd) = start { count_builder = count_builder.bind(sd); }
        if let Some(ed) = end { count_builder = count_builder.bind(ed); }
        if let Some(ref q) = search { count_builder = count_builder.bind(q); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY COALESCE(r.check_in, r.created_at) DESC, r.id DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT, where_clause, per_page, offset
        );
        let mut builder = sqlx::query(&select_q);
        if let Some(sd) = start { builder = builder.bind(sd); }
        if let Some(ed) = end { builder = builder.bind(ed); }
        if let Some(ref q) = search { builder = builder.bind(q); }

        let rows = builder.fetch_all(&self.pool).await?;
        let reports = rows
            .iter()
            .map(details_from_row)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((reports, total))
    }

    /// Get report by ID with owner details
    pub async fn get_details(&self, id: i32) -> AppResult<ReportDetails> {
        let q = format!("{} WHERE r.id = $1", DETAILS_SELECT);
        let row = sqlx::query(&q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report with id {} not found", id)))?;
        details_from_row(&row)
    }

    /// Update the free-text remarks of a report
    pub async fn update_remarks(&self, id: i32, remarks: Option<&str>) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE reports SET remarks = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(remarks)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Report with id {} not found", id)));
        }
        Ok(())
    }

    /// Delete a report
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Report with id {} not found", id)));
        }
        Ok(())
    }
}

fn details_from_row(row: &PgRow) -> AppResult<ReportDetails> {
    let id: i32 = row.get("id");
    let owner = match (
        row.get::<Option<i32>, _>("visitor_id"),
        row.get::<Option<i32>, _>("invite_id"),
    ) {
        (Some(v), None) => ReportOwner::Visitor(v),
        (None, Some(i)) => ReportOwner::Invite(i),
        _ => {
            return Err(AppError::Internal(format!(
                "Report {} does not have exactly one owner",
                id
            )))
        }
    };

    let name: Option<String> = row.get("owner_name");
    let name = name.unwrap_or_default();

    Ok(ReportDetails {
        id,
        owner,
        visitor_name: name.clone(),
        check_in: row.get("check_in"),
        check_out: row.get("check_out"),
        remarks: row.get("remarks"),
        visit_count: row.get("visit_count"),
        owner_details: OwnerSummary {
            name,
            email: row.get::<Option<String>, _>("owner_email").unwrap_or_default(),
            phone: row.get("owner_phone"),
            purpose: row.get("owner_purpose"),
            status: row.get::<Option<String>, _>("owner_status").unwrap_or_default(),
            image: row.get("owner_image"),
        },
    })
}
