//! Employee profile endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::employee::{CreateEmployee, Employee, EmployeeQuery, UpdateEmployee},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List employee profiles (employees only see their own)
#[utoipa::path(
    get,
    path = "/employees",
    tag = "employees",
    security(("bearer_auth" = [])),
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employee profiles", body = super::EmployeesPage)
    )
)]
pub async fn list_employees(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<EmployeeQuery>,
) -> AppResult<Json<PaginatedResponse<Employee>>> {
    let (employees, total) = state.services.employees.list(&query, &claims).await?;
    Ok(Json(PaginatedResponse::new(employees, total, query.page, query.per_page)))
}

/// Create an employee profile
#[utoipa::path(
    post,
    path = "/employees",
    tag = "employees",
    security(("bearer_auth" = [])),
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Profile created", body = Employee),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 409, description = "User already has a profile", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_employee(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateEmployee>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    data.validate()?;
    let employee = state.services.employees.create(&data, &claims).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

/// Get an employee profile
#[utoipa::path(
    get,
    path = "/employees/{id}",
    tag = "employees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee profile", body = Employee),
        (status = 403, description = "Not your profile", body = crate::error::ErrorResponse),
        (status = 404, description = "Employee not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_employee(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Employee>> {
    let employee = state.services.employees.get(id, &claims).await?;
    Ok(Json(employee))
}

/// Update an employee profile
#[utoipa::path(
    put,
    path = "/employees/{id}",
    tag = "employees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Employee ID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Profile updated", body = Employee),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_employee(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateEmployee>,
) -> AppResult<Json<Employee>> {
    data.validate()?;
    let employee = state.services.employees.update(id, &data, &claims).await?;
    Ok(Json(employee))
}

/// Delete an employee profile (superadmin only)
#[utoipa::path(
    delete,
    path = "/employees/{id}",
    tag = "employees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Employee ID")),
    responses(
        (status = 204, description = "Profile deleted"),
        (status = 403, description = "Superadmin privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_employee(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.employees.delete(id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}
