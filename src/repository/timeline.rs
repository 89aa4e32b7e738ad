//! Status timeline repository (append-only)

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::timeline::{TimelineEntry, TimelineOwner},
};

#[derive(Clone)]
pub struct TimelineRepository {
    pool: Pool<Postgres>,
}

impl TimelineRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Append one row carrying the post-mutation status
    pub async fn append(
        &self,
        conn: &mut PgConnection,
        owner: TimelineOwner,
        status: &str,
        updated_by: Option<i32>,
    ) -> AppResult<()> {
        let q = format!(
            "INSERT INTO {} ({}, status, updated_by) VALUES ($1, $2, $3)",
            owner.table(),
            owner.owner_column()
        );
        sqlx::query(&q)
            .bind(owner.id())
            .bind(status)
            .bind(updated_by)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Timeline of an entity, newest first
    pub async fn list(&self, owner: TimelineOwner) -> AppResult<Vec<TimelineEntry>> {
        let q = format!(
            r#"
            SELECT t.id, t.status, t.updated_by, u.username AS updated_by_name, t.created_at
            FROM {} t
            LEFT JOIN users u ON u.id = t.updated_by
            WHERE t.{} = $1
            ORDER BY t.created_at DESC, t.id DESC
            "#,
            owner.table(),
            owner.owner_column()
        );
        let rows = sqlx::query_as::<_, TimelineEntry>(&q)
            .bind(owner.id())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
