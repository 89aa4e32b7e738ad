//! Employee profile administration

use crate::{
    error::{AppError, AppResult},
    models::{
        employee::{CreateEmployee, Employee, EmployeeQuery, UpdateEmployee},
        user::{Role, UserClaims},
    },
    repository::Repository,
};

/// Operation on the employee resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeAction {
    List,
    Read,
    Create,
    Update,
    Delete,
}

/// Role rules for employee profiles.
///
/// Superadmins may do anything and admins anything but delete. Employees may
/// only list and read, and only their own profile (`owner` is the user id of
/// the profile being read).
pub fn authorize(claims: &UserClaims, action: EmployeeAction, owner: Option<i32>) -> AppResult<()> {
    let allowed = match (claims.role, action) {
        (Role::Superadmin, _) => true,
        (Role::Admin, EmployeeAction::Delete) => false,
        (Role::Admin, _) => true,
        (Role::Employee, EmployeeAction::List) => true,
        (Role::Employee, EmployeeAction::Read) => owner == Some(claims.user_id),
        (Role::Employee, _) => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Authorization(format!(
            "Role {} may not {:?} this employee profile",
            claims.role, action
        )))
    }
}

#[derive(Clone)]
pub struct EmployeesService {
    repository: Repository,
}

impl EmployeesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List profiles; employees only see their own
    pub async fn list(&self, query: &EmployeeQuery, actor: &UserClaims) -> AppResult<(Vec<Employee>, i64)> {
        authorize(actor, EmployeeAction::List, None)?;
        let only_user = (actor.role == Role::Employee).then_some(actor.user_id);
        self.repository.employees.list(query, only_user).await
    }

    /// Get profile by ID
    pub async fn get(&self, id: i32, actor: &UserClaims) -> AppResult<Employee> {
        let employee = self.repository.employees.get_by_id(id).await?;
        authorize(actor, EmployeeAction::Read, Some(employee.user_id))?;
        Ok(employee)
    }

    /// Create a profile, registering the account if it has not acted yet
    pub async fn create(&self, data: &CreateEmployee, actor: &UserClaims) -> AppResult<Employee> {
        authorize(actor, EmployeeAction::Create, None)?;

        let mut tx = self.repository.pool.begin().await?;
        let id = self.repository.employees.insert(&mut *tx, data).await?;
        tx.commit().await?;

        tracing::info!("Employee profile {} created for user {} by {}", id, data.user_id, actor.user_id);
        self.repository.employees.get_by_id(id).await
    }

    /// Update profile fields
    pub async fn update(&self, id: i32, data: &UpdateEmployee, actor: &UserClaims) -> AppResult<Employee> {
        authorize(actor, EmployeeAction::Update, None)?;
        self.repository.employees.update(id, data).await
    }

    /// Delete a profile
    pub async fn delete(&self, id: i32, actor: &UserClaims) -> AppResult<()> {
        authorize(actor, EmployeeAction::Delete, None)?;
        self.repository.employees.delete(id).await
    }
}
