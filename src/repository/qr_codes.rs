//! Generated code images repository

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::qr_code::QrCode};

/// Columns of a new row, after defaults are resolved
#[derive(Debug, Clone)]
pub struct NewQrCode<'a> {
    pub text: &'a str,
    pub image: &'a str,
    pub size: i32,
    pub error_correction: &'a str,
    pub background: &'a str,
    pub foreground: &'a str,
    pub created_by: i32,
}

#[derive(Clone)]
pub struct QrCodesRepository {
    pool: Pool<Postgres>,
}

impl QrCodesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Codes created by one user, newest first
    pub async fn list_by_owner(&self, user_id: i32) -> AppResult<Vec<QrCode>> {
        let rows = sqlx::query_as::<_, QrCode>(
            "SELECT * FROM qr_codes WHERE created_by = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert(&self, row: &NewQrCode<'_>) -> AppResult<QrCode> {
        let code = sqlx::query_as::<_, QrCode>(
            r#"
            INSERT INTO qr_codes (text, image, size, error_correction, background, foreground, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(row.text)
        .bind(row.image)
        .bind(row.size)
        .bind(row.error_correction)
        .bind(row.background)
        .bind(row.foreground)
        .bind(row.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(code)
    }
}
