//! Expansion of stored user ids into display summaries
//!
//! Each call issues a single `summaries` lookup for every id referenced by
//! the batch. Ids that no longer resolve become `null` (or are dropped from
//! project teams).

use std::collections::HashMap;
use uuid::Uuid;

use super::{StoreResult, UserRepository};
use crate::models::project::{Project, ProjectView};
use crate::models::task::{Task, TaskView};
use crate::models::user::UserSummary;

async fn lookup(
    users: &dyn UserRepository,
    mut ids: Vec<Uuid>,
) -> StoreResult<HashMap<Uuid, UserSummary>> {
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let summaries = users.summaries(&ids).await?;
    Ok(summaries.into_iter().map(|s| (s.id, s)).collect())
}

pub async fn expand_tasks(
    users: &dyn UserRepository,
    tasks: Vec<Task>,
) -> StoreResult<Vec<TaskView>> {
    let ids = tasks.iter().flat_map(Task::referenced_users).collect();
    let summaries = lookup(users, ids).await?;
    Ok(tasks
        .into_iter()
        .map(|task| TaskView::build(task, &summaries))
        .collect())
}

pub async fn expand_task(users: &dyn UserRepository, task: Task) -> StoreResult<TaskView> {
    let summaries = lookup(users, task.referenced_users()).await?;
    Ok(TaskView::build(task, &summaries))
}

pub async fn expand_projects(
    users: &dyn UserRepository,
    projects: Vec<Project>,
) -> StoreResult<Vec<ProjectView>> {
    let ids = projects.iter().flat_map(Project::referenced_users).collect();
    let summaries = lookup(users, ids).await?;
    Ok(projects
        .into_iter()
        .map(|project| ProjectView::build(project, &summaries))
        .collect())
}

pub async fn expand_project(
    users: &dyn UserRepository,
    project: Project,
) -> StoreResult<ProjectView> {
    let summaries = lookup(users, project.referenced_users()).await?;
    Ok(ProjectView::build(project, &summaries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::{CreateProject, ProjectStatus};
    use crate::models::task::{CreateTask, TaskPriority, TaskStatus};
    use crate::models::user::{CreateUser, UserRole};
    use crate::store::Store;
    use chrono::Utc;

    async fn create_user(store: &Store, username: &str) -> Uuid {
        store
            .users
            .create(CreateUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "hash".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role: UserRole::User,
            })
            .await
            .unwrap()
            .id
    }

    fn task(created_by: Uuid, assigned_to: Option<Uuid>) -> Task {
        CreateTask {
            title: "Write docs".to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            assigned_to,
            created_by,
            project: "docs".to_string(),
            tags: vec![],
            due_date: None,
            estimated_hours: 0.0,
            actual_hours: 0.0,
        }
        .into_task()
    }

    #[tokio::test]
    async fn test_expand_tasks_resolves_known_users() {
        let store = Store::memory();
        let alice = create_user(&store, "alice").await;
        let ghost = Uuid::new_v4();

        let views = expand_tasks(
            store.users.as_ref(),
            vec![task(alice, Some(ghost)), task(alice, Some(alice))],
        )
        .await
        .unwrap();

        assert_eq!(views[0].created_by.as_ref().unwrap().username, "alice");
        assert!(views[0].assigned_to.is_none());
        assert_eq!(views[1].assigned_to.as_ref().unwrap().id, alice);
    }

    #[tokio::test]
    async fn test_expand_project_drops_dangling_team_members() {
        let store = Store::memory();
        let owner = create_user(&store, "owner").await;
        let member = create_user(&store, "member").await;

        let project = CreateProject {
            name: "Launch".to_string(),
            description: String::new(),
            status: ProjectStatus::Planning,
            owner_id: owner,
            team: vec![member, Uuid::new_v4()],
            start_date: Utc::now(),
            end_date: None,
            budget: None,
            progress: 0,
        }
        .into_project();

        let view = expand_project(store.users.as_ref(), project).await.unwrap();
        assert_eq!(view.owner.unwrap().username, "owner");
        assert_eq!(view.team.len(), 1);
        assert_eq!(view.team[0].username, "member");
    }
}
