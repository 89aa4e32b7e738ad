//! Invites repository for database operations

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        invite::{CreateInvite, Invite, InviteQuery, UpdateInvite},
        status::{InviteStatus, StatusChange},
    },
};

use super::{local_day_window, page_bounds, parse_date};

#[derive(Clone)]
pub struct InvitesRepository {
    pool: Pool<Postgres>,
}

impl InvitesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List invites with optional filters and pagination
    pub async fn list(&self, query: &InviteQuery, tz: Tz) -> AppResult<(Vec<Invite>, i64)> {
        let (per_page, offset) = page_bounds(query.page, query.per_page);

        let status = query
            .status
            .as_deref()
            .map(str::parse::<InviteStatus>)
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
                "(visitor_name ILIKE ${0} OR visitor_email ILIKE ${0} \
                 OR visitor_phone ILIKE ${0} OR purpose ILIKE ${0})",
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!("SELECT COUNT(*) FROM invites {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(s) = status { count_builder = count_builder.bind(s); }
        if let Some(sd) = start { count_builder = count_builder.bind(sd); }
        if let Some(ed) = end { count_builder = count_builder.bind(ed); }
        if let Some(ref q) = search { count_builder = count_builder.bind(q); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM invites {} ORDER BY created_at DESC, id DESC LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, Invite>(&select_q);
        if let Some(s) = status { builder = builder.bind(s); }
        if let Some(sd) = start { builder = builder.bind(sd); }
        if let Some(ed) = end { builder = builder.bind(ed); }
        if let Some(ref q) = search { builder = builder.bind(q); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    /// Get invite by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Invite> {
        sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invite with id {} not found", id)))
    }

    /// Get invite by its invite code (case-insensitive)
    pub async fn get_by_code(&self, code: &str) -> AppResult<Invite> {
        sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE invite_code = UPPER($1)")
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invite with code {} not found", code)))
    }

    /// Check whether an invite code is already taken
    pub async fn code_exists(&self, code: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM invites WHERE invite_code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Lock an invite row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Invite> {
        sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invite with id {} not found", id)))
    }

    /// Insert a new invite in the `created` status
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        data: &CreateInvite,
        invited_by: i32,
        invite_code: &str,
        expiry_time: DateTime<Utc>,
    ) -> AppResult<Invite> {
        sqlx::query_as::<_, Invite>(
            r#"
            INSERT INTO invites (
                invited_by, visitor_name, visitor_email, visitor_phone, purpose,
                visit_time, expiry_time, invite_code, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(invited_by)
        .bind(data.visitor_name.trim())
        .bind(data.visitor_email.trim())
        .bind(&data.visitor_phone)
        .bind(&data.purpose)
        .bind(data.visit_time)
        .bind(expiry_time)
        .bind(invite_code)
        .bind(InviteStatus::Created)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Invite for this email"))
    }

    /// Write the fields of an applied status transition
    pub async fn apply_status(
        &self,
        conn: &mut PgConnection,
        id: i32,
        change: &StatusChange<InviteStatus>,
    ) -> AppResult<Invite> {
        let row = sqlx::query_as::<_, Invite>(
            r#"
            UPDATE invites
            SET status = $2,
                check_in = COALESCE($3, check_in),
                checked_out = COALESCE($4, checked_out),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(change.status)
        .bind(change.check_in)
        .bind(change.check_out)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// Replace the invite code and optionally move the visit window
    pub async fn reissue(
        &self,
        conn: &mut PgConnection,
        id: i32,
        invite_code: &str,
        visit_time: DateTime<Utc>,
        expiry_time: DateTime<Utc>,
    ) -> AppResult<Invite> {
        let row = sqlx::query_as::<_, Invite>(
            r#"
            UPDATE invites
            SET invite_code = $2, visit_time = $3, expiry_time = $4,
                check_in = NULL, checked_out = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(invite_code)
        .bind(visit_time)
        .bind(expiry_time)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Invite code"))?;
        Ok(row)
    }

    /// Update contact fields and visit window
    pub async fn update(&self, id: i32, data: &UpdateInvite) -> AppResult<Invite> {
        sqlx::query_as::<_, Invite>(
            r#"
            UPDATE invites
            SET visitor_name = COALESCE($2, visitor_name),
                visitor_email = COALESCE($3, visitor_email),
                visitor_phone = COALESCE($4, visitor_phone),
                purpose = COALESCE($5, purpose),
                visit_time = COALESCE($6, visit_time),
                expiry_time = COALESCE($7, expiry_time),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.visitor_name)
        .bind(&data.visitor_email)
        .bind(&data.visitor_phone)
        .bind(&data.purpose)
        .bind(data.visit_time)
        .bind(data.expiry_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Invite for this email"))?
        .ok_or_else(|| AppError::NotFound(format!("Invite with id {} not found", id)))
    }

    /// Record the URL of the rendered invite code image
    pub async fn set_qr_code(&self, id: i32, url: &str) -> AppResult<Invite> {
        let row = sqlx::query_as::<_, Invite>(
            "UPDATE invites SET qr_code = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Record the captured photo and the issued pass image
    pub async fn set_capture(
        &self,
        conn: &mut PgConnection,
        id: i32,
        image: &str,
        pass_image: Option<&str>,
    ) -> AppResult<Invite> {
        let row = sqlx::query_as::<_, Invite>(
            r#"
            UPDATE invites
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

    /// Delete an invite; timeline and report rows cascade
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM invites WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Invite with id {} not found", id)));
        }
        Ok(())
    }
}
