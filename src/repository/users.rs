//! Staff users repository
//!
//! Staff accounts are issued by the identity provider. Rows here only anchor
//! `issued_by`, `invited_by` and `updated_by` references.

use sqlx::PgConnection;

use crate::{
    error::AppResult,
    models::user::{StaffUser, UserClaims},
};

#[derive(Clone, Default)]
pub struct UsersRepository;

impl UsersRepository {
    pub fn new() -> Self {
        Self
    }

    /// Make sure the principal of a validated token has a users row
    pub async fn sync_principal(
        &self,
        conn: &mut PgConnection,
        claims: &UserClaims,
    ) -> AppResult<StaffUser> {
        let username = claims
            .sub
            .split('@')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&claims.sub);

        let user = sqlx::query_as::<_, StaffUser>(
            r#"
            INSERT INTO users (id, email, username, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET role = EXCLUDED.role
            RETURNING id, email, username, role, created_at
            "#,
        )
        .bind(claims.user_id)
        .bind(&claims.sub)
        .bind(username)
        .bind(claims.role.as_str())
        .fetch_one(conn)
        .await?;
        Ok(user)
    }
}
