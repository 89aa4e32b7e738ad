//! Employee profiles repository

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::employee::{CreateEmployee, Employee, EmployeeQuery, UpdateEmployee},
};

use super::page_bounds;

const EMPLOYEE_SELECT: &str = r#"
    SELECT e.id, e.user_id, u.email, u.username AS name, u.role,
           e.designation, e.department, e.phone, e.joined_date, e.is_active,
           e.created_at, e.updated_at
    FROM employees e
    JOIN users u ON u.id = e.user_id
"#;

#[derive(Clone)]
pub struct EmployeesRepository {
    pool: Pool<Postgres>,
}

impl EmployeesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List profiles; `only_user` restricts the result to one account
    pub async fn list(
        &self,
        query: &EmployeeQuery,
        only_user: Option<i32>,
    ) -> AppResult<(Vec<Employee>, i64)> {
        let (per_page, offset) = page_bounds(query.page, query.per_page);

        let department = query
            .department
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let mut conditions = Vec::new();
        let mut idx = 1;

        if only_user.is_some() {
            conditions.push(format!("e.user_id = ${}", idx));
            idx += 1;
        }
        if department.is_some() {
            conditions.push(format!("LOWER(e.department) = LOWER(${})", idx));
            idx += 1;
        }
        if query.is_active.is_some() {
            conditions.push(format!("e.is_active = ${}", idx));
            idx += 1;
        }
        if search.is_some() {
            conditions.push(format!(
                "(u.username ILIKE ${0} OR u.email ILIKE ${0} OR e.designation ILIKE ${0})",
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!(
            "SELECT COUNT(*) FROM employees e JOIN users u ON u.id = e.user_id {}",
            where_clause
        );
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(u) = only_user { count_builder = count_builder.bind(u); }
        if let Some(d) = department { count_builder = count_builder.bind(d); }
        if let Some(a) = query.is_active { count_builder = count_builder.bind(a); }
        if let Some(ref q) = search { count_builder = count_builder.bind(q); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY u.username, e.id LIMIT {} OFFSET {}",
            EMPLOYEE_SELECT, where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, Employee>(&select_q);
        if let Some(u) = only_user { builder = builder.bind(u); }
        if let Some(d) = department { builder = builder.bind(d); }
        if let Some(a) = query.is_active { builder = builder.bind(a); }
        if let Some(ref q) = search { builder = builder.bind(q); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    /// Get profile by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Employee> {
        let q = format!("{} WHERE e.id = $1", EMPLOYEE_SELECT);
        sqlx::query_as::<_, Employee>(&q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee with id {} not found", id)))
    }

    /// Create the user row if the account has never acted yet, then its profile.
    /// Returns the new profile id.
    pub async fn insert(&self, conn: &mut PgConnection, data: &CreateEmployee) -> AppResult<i32> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, role)
            VALUES ($1, $2, $3, 'employee')
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, username = EXCLUDED.username
            "#,
        )
        .bind(data.user_id)
        .bind(data.email.trim())
        .bind(data.name.trim())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "User with this email"))?;

        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO employees (user_id, designation, department, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(data.user_id)
        .bind(data.designation.trim())
        .bind(&data.department)
        .bind(&data.phone)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Employee profile for this user"))
    }

    /// Update profile fields
    pub async fn update(&self, id: i32, data: &UpdateEmployee) -> AppResult<Employee> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET designation = COALESCE($2, designation),
                department = COALESCE($3, department),
                phone = COALESCE($4, phone),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&data.designation)
        .bind(&data.department)
        .bind(&data.phone)
        .bind(data.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Employee with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    /// Delete a profile; the user row stays for audit references
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Employee with id {} not found", id)));
        }
        Ok(())
    }
}
