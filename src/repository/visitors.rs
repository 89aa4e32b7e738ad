//! Visitors repository for database operations

use chrono::Utc;
use chrono_tz::Tz;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        status::{StatusChange, VisitorStatus},
        visitor::{RegisterVisitor, UpdateVisitor, Visitor, VisitorQuery},
    },
};

use super::{local_day_window, page_bounds, parse_date};

#[derive(Clone)]
pub struct VisitorsRepository {
    pool: Pool<Postgres>,
}

impl VisitorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List visitors with optional filters and pagination
    pub async fn list(&self, query: &VisitorQuery, tz: Tz) -> AppResult<(Vec<Visitor>, i64)> {
        let (per_page, offset) = page_bounds(query.page, query.per_page);

        let status = query
            .status
            .as_deref()
            .map(str::parse::<VisitorStatus>)
            .transpose()?;
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

        if status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        if start.is_some() {
            conditions.push(format!("created_at >= ${}", idx));
            idx += 1;
        }
        if end.is_some() {
            conditions.push(format!("created_at < ${}", idx));
            idx += 1;
        }
        if search.is_some() {
            conditions.push(format!(
                "(name ILIKE ${0} OR email ILIKE ${0} OR phone ILIKE ${0} OR purpose ILIKE ${0})",
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!("SELECT COUNT(*) FROM visitors {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(s) = status { count_builder = count_builder.bind(s); }
        if let Some(sd) = start { count_builder = count_builder.bind(sd); }
        if let Some(ed) = end { count_builder = count_builder.bind(ed); }
        if let Some(ref q) = search { count_builder = count_builder.bind(q); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM visitors {} ORDER BY created_at DESC, id DESC LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, Visitor>(&select_q);
        if let Some(s) = status { builder = builder.bind(s); }
        if let Some(sd) = start { builder = builder.bind(sd); }
        if let Some(ed) = end { builder = builder.bind(ed); }
        if let Some(ref q) = search { builder = builder.bind(q); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    /// Get visitor by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Visitor> {
        sqlx::query_as::<_, Visitor>("SELECT * FROM visitors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Visitor with id {} not found", id)))
    }

    /// Lock a visitor row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Visitor> {
        sqlx::query_as::<_, Visitor>("SELECT * FROM visitors WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Visitor with id {} not found", id)))
    }

    /// Serialize registrations of one email for the rest of the transaction,
    /// then lock the visitor registered under it, if any.
    ///
    /// The advisory lock covers the case where no row exists yet, so two
    /// concurrent first registrations cannot both take the insert path.
    pub async fn lock_by_email(
        &self,
        conn: &mut PgConnection,
        email: &str,
    ) -> AppResult<Option<Visitor>> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext(LOWER($1)))")
            .bind(email)
            .execute(&mut *conn)
            .await?;

        let visitor = sqlx::query_as::<_, Visitor>(
            "SELECT * FROM visitors WHERE LOWER(email) = LOWER($1) FOR UPDATE",
        )
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(visitor)
    }

    /// Insert a newly registered visitor
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        data: &RegisterVisitor,
        status: VisitorStatus,
        issued_by: Option<i32>,
    ) -> AppResult<Visitor> {
        sqlx::query_as::<_, Visitor>(
            r#"
            INSERT INTO visitors (name, email, phone, company, purpose, status, issued_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(data.email.trim())
        .bind(data.phone.trim())
        .bind(&data.company)
        .bind(&data.purpose)
        .bind(status)
        .bind(issued_by)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Visitor with this email"))
    }

    /// Refresh a returning visitor's contact fields and reset the visit
    pub async fn refresh_for_revisit(
        &self,
        conn: &mut PgConnection,
        id: i32,
        data: &RegisterVisitor,
    ) -> AppResult<Visitor> {
        let row = sqlx::query_as::<_, Visitor>(
            r#"
            UPDATE visitors
            SET name = $2, phone = $3,
                company = COALESCE($4, company),
                purpose = COALESCE($5, purpose),
                check_in = NULL, check_out = NULL,
                is_active = TRUE, updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(data.phone.trim())
        .bind(&data.company)
        .bind(&data.purpose)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// Write the fields of an applied status transition
    pub async fn apply_status(
        &self,
        conn: &mut PgConnection,
        id: i32,
        change: &StatusChange<VisitorStatus>,
    ) -> AppResult<Visitor> {
        let row = sqlx::query_as::<_, Visitor>(
            r#"
            UPDATE visitors
            SET status = $2,
                check_in = COALESCE($3, check_in),
                check_out = COALESCE($4, check_out),
                is_active = CASE WHEN $5 THEN FALSE ELSE is_active END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(change.status)
        .bind(change.check_in)
        .bind(change.check_out)
        .bind(change.deactivate)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// Update contact fields
    pub async fn update(&self, id: i32, data: &UpdateVisitor) -> AppResult<Visitor> {
        sqlx::query_as::<_, Visitor>(
            r#"
            UPDATE visitors
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                company = COALESCE($5, company),
                purpose = COALESCE($6, purpose),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.company)
        .bind(&data.purpose)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Visitor with this email"))?
        .ok_or_else(|| AppError::NotFound(format!("Visitor with id {} not found", id)))
    }

    /// Record the captured photo and the issued pass image
    pub async fn set_capture(
        &self,
        conn: &mut PgConnection,
        id: i32,
        image: &str,
        pass_image: Option<&str>,
    ) -> AppResult<Visitor> {
        let row = sqlx::query_as::<_, Visitor>(
            r#"
            UPDATE visitors
            SET image = $2, pass_image = COALESCE($3, pass_image), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(image)
        .bind(pass_image)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// Delete a visitor; timeline and report rows cascade
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM visitors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Visitor with id {} not found", id)));
        }
        Ok(())
    }
}
