/// Role gates
///
/// Handlers call these after loading the target resource. Roles come from the
/// access token, so a role change applies from the next login or refresh.
///
/// | Operation | Allowed |
/// |---|---|
/// | change a user's role, delete a user | admin |
/// | update/delete a project | owner, manager, admin |
/// | update a task | creator, assignee, manager, admin |
/// | delete a task | creator, manager, admin |
///
/// # Example
///
/// ```
/// use taskhub_shared::auth::authorization::require_role;
/// use taskhub_shared::auth::middleware::AuthContext;
/// use taskhub_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let auth = AuthContext {
///     user_id: Uuid::new_v4(),
///     username: "alice".to_string(),
///     role: UserRole::User,
/// };
///
/// assert!(require_role(&auth, &[UserRole::Admin]).is_err());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::project::Project;
use crate::models::task::Task;
use crate::models::user::UserRole;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Insufficient permissions: requires one of {required:?}, has {actual}")]
    InsufficientRole {
        required: Vec<UserRole>,
        actual: UserRole,
    },

    #[error("Not authorized to modify this resource")]
    NotAuthorized,
}

/// Requires the caller to hold one of `allowed`
pub fn require_role(auth: &AuthContext, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if !allowed.contains(&auth.role) {
        return Err(AuthzError::InsufficientRole {
            required: allowed.to_vec(),
            actual: auth.role,
        });
    }
    Ok(())
}

/// Requires the caller to be one of `owners`, or a manager/admin
pub fn require_owner_or_staff(auth: &AuthContext, owners: &[Uuid]) -> Result<(), AuthzError> {
    if auth.role.is_staff() || owners.contains(&auth.user_id) {
        return Ok(());
    }
    Err(AuthzError::NotAuthorized)
}

pub fn require_task_editor(auth: &AuthContext, task: &Task) -> Result<(), AuthzError> {
    let mut owners = vec![task.created_by];
    owners.extend(task.assigned_to);
    require_owner_or_staff(auth, &owners)
}

pub fn require_task_owner(auth: &AuthContext, task: &Task) -> Result<(), AuthzError> {
    require_owner_or_staff(auth, &[task.created_by])
}

pub fn require_project_owner(auth: &AuthContext, project: &Project) -> Result<(), AuthzError> {
    require_owner_or_staff(auth, &[project.owner_id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::{CreateProject, ProjectStatus};
    use crate::models::task::{CreateTask, TaskPriority, TaskStatus};
    use chrono::Utc;

    fn auth(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            username: "someone".to_string(),
            role,
        }
    }

    fn task(created_by: Uuid, assigned_to: Option<Uuid>) -> Task {
        CreateTask {
            title: "t".to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            assigned_to,
            created_by,
            project: "p".to_string(),
            tags: vec![],
            due_date: None,
            estimated_hours: 0.0,
            actual_hours: 0.0,
        }
        .into_task()
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&auth(UserRole::Admin), &[UserRole::Admin]).is_ok());
        assert!(matches!(
            require_role(&auth(UserRole::Manager), &[UserRole::Admin]),
            Err(AuthzError::InsufficientRole { actual: UserRole::Manager, .. })
        ));
    }

    #[test]
    fn test_task_gates() {
        let creator = auth(UserRole::User);
        let assignee = auth(UserRole::User);
        let stranger = auth(UserRole::User);
        let t = task(creator.user_id, Some(assignee.user_id));

        assert!(require_task_editor(&creator, &t).is_ok());
        assert!(require_task_editor(&assignee, &t).is_ok());
        assert!(require_task_editor(&stranger, &t).is_err());
        assert!(require_task_editor(&auth(UserRole::Manager), &t).is_ok());

        assert!(require_task_owner(&creator, &t).is_ok());
        assert!(require_task_owner(&assignee, &t).is_err());
        assert!(require_task_owner(&auth(UserRole::Admin), &t).is_ok());
    }

    #[test]
    fn test_project_gate() {
        let owner = auth(UserRole::User);
        let project = CreateProject {
            name: "p".to_string(),
            description: String::new(),
            status: ProjectStatus::Planning,
            owner_id: owner.user_id,
            team: vec![],
            start_date: Utc::now(),
            end_date: None,
            budget: None,
            progress: 0,
        }
        .into_project();

        assert!(require_project_owner(&owner, &project).is_ok());
        assert!(require_project_owner(&auth(UserRole::User), &project).is_err());
        assert!(require_project_owner(&auth(UserRole::Manager), &project).is_ok());
    }
}
