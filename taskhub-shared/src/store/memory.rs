//! In-process store
//!
//! Keeps every collection in insertion order behind a `tokio::sync::RwLock`;
//! newest-first listings walk the vectors backwards. Uniqueness rules match
//! the PostgreSQL indexes (case-insensitive username and email).

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ConsumeOutcome, ProjectRepository, RefreshTokenRecord, RefreshTokenRepository, StoreError,
    StoreResult, TaskRepository, UserRepository,
};
use crate::models::project::{CreateProject, Project, ProjectFilter, UpdateProject};
use crate::models::task::{
    Attachment, Comment, CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask,
};
use crate::models::user::{CreateUser, UpdateUser, User, UserFilter, UserSummary};
use crate::models::Page;

#[derive(Default)]
struct Collections {
    users: RwLock<Vec<User>>,
    tasks: RwLock<Vec<Task>>,
    projects: RwLock<Vec<Project>>,
    refresh_tokens: RwLock<HashMap<Uuid, RefreshTokenRecord>>,
}

/// Shared handle; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Collections>,
}

/// Newest-first page over the records matching `keep`
fn page_newest_first<T, F>(items: &[T], page: Page, keep: F) -> (Vec<T>, i64)
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let matching: Vec<&T> = items.iter().rev().filter(|item| keep(item)).collect();
    let total = matching.len() as i64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let slice = matching
        .into_iter()
        .skip(offset)
        .take(page.limit as usize)
        .cloned()
        .collect();
    (slice, total)
}

fn check_user_uniqueness(
    users: &[User],
    skip: Option<Uuid>,
    username: Option<&str>,
    email: Option<&str>,
) -> StoreResult<()> {
    let username = username.map(str::to_lowercase);
    let email = email.map(str::to_lowercase);
    for user in users.iter().filter(|u| Some(u.id) != skip) {
        if username.as_deref() == Some(user.username.to_lowercase().as_str()) {
            return Err(StoreError::Duplicate { field: "username" });
        }
        if email.as_deref() == Some(user.email.to_lowercase().as_str()) {
            return Err(StoreError::Duplicate { field: "email" });
        }
    }
    Ok(())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, data: CreateUser) -> StoreResult<User> {
        let mut users = self.inner.users.write().await;
        check_user_uniqueness(&users, None, Some(&data.username), Some(&data.email))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email.to_lowercase(),
            password_hash: data.password_hash,
            first_name: data.first_name,
            last_name: data.last_name,
            role: data.role,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.inner.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let login = login.to_lowercase();
        let users = self.inner.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username.to_lowercase() == login || u.email.to_lowercase() == login)
            .cloned())
    }

    async fn list(&self, filter: &UserFilter, page: Page) -> StoreResult<(Vec<User>, i64)> {
        let users = self.inner.users.read().await;
        Ok(page_newest_first(&users, page, |u| filter.matches(u)))
    }

    async fn update(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut users = self.inner.users.write().await;
        check_user_uniqueness(&users, Some(id), None, data.email.as_deref())?;

        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = data.email {
            user.email = email.to_lowercase();
        }
        if let Some(hash) = data.password_hash {
            user.password_hash = hash;
        }
        if let Some(first_name) = data.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = data.last_name {
            user.last_name = last_name;
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        if let Some(is_active) = data.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut users = self.inner.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }

    async fn touch_last_login(&self, id: Uuid) -> StoreResult<()> {
        let mut users = self.inner.users.write().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>> {
        let users = self.inner.users.read().await;
        Ok(users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(User::summary)
            .collect())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn list(&self, filter: &TaskFilter, page: Page) -> StoreResult<(Vec<Task>, i64)> {
        let tasks = self.inner.tasks.read().await;
        Ok(page_newest_first(&tasks, page, |t| filter.matches(t)))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let tasks = self.inner.tasks.read().await;
        Ok(tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn create(&self, data: CreateTask) -> StoreResult<Task> {
        let task = data.into_task();
        self.inner.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let mut tasks = self.inner.tasks.write().await;
        Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.apply(data);
            task.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tasks = self.inner.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() != before)
    }

    async fn add_comment(&self, id: Uuid, comment: Comment) -> StoreResult<Option<Task>> {
        let mut tasks = self.inner.tasks.write().await;
        Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.comments.0.push(comment);
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn add_attachment(&self, id: Uuid, attachment: Attachment) -> StoreResult<Option<Task>> {
        let mut tasks = self.inner.tasks.write().await;
        Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.attachments.0.push(attachment);
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn count(&self, filter: &TaskFilter) -> StoreResult<i64> {
        let tasks = self.inner.tasks.read().await;
        Ok(tasks.iter().filter(|t| filter.matches(t)).count() as i64)
    }

    async fn count_by_status(&self) -> StoreResult<Vec<(TaskStatus, i64)>> {
        let tasks = self.inner.tasks.read().await;
        Ok(TaskStatus::ALL
            .into_iter()
            .map(|status| (status, tasks.iter().filter(|t| t.status == status).count() as i64))
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    async fn count_by_priority(&self) -> StoreResult<Vec<(TaskPriority, i64)>> {
        let tasks = self.inner.tasks.read().await;
        Ok(TaskPriority::ALL
            .into_iter()
            .map(|priority| {
                let count = tasks.iter().filter(|t| t.priority == priority).count() as i64;
                (priority, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    async fn recent(&self, limit: u32) -> StoreResult<Vec<Task>> {
        let tasks = self.inner.tasks.read().await;
        Ok(tasks.iter().rev().take(limit as usize).cloned().collect())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn list(&self, filter: &ProjectFilter, page: Page) -> StoreResult<(Vec<Project>, i64)> {
        let projects = self.inner.projects.read().await;
        Ok(page_newest_first(&projects, page, |p| filter.matches(p)))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let projects = self.inner.projects.read().await;
        Ok(projects.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, data: CreateProject) -> StoreResult<Project> {
        let project = data.into_project();
        self.inner.projects.write().await.push(project.clone());
        Ok(project)
    }

    async fn update(&self, id: Uuid, data: UpdateProject) -> StoreResult<Option<Project>> {
        let mut projects = self.inner.projects.write().await;
        Ok(projects.iter_mut().find(|p| p.id == id).map(|project| {
            project.apply(data);
            project.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut projects = self.inner.projects.write().await;
        let before = projects.len();
        projects.retain(|p| p.id != id);
        Ok(projects.len() != before)
    }

    async fn count(&self, filter: &ProjectFilter) -> StoreResult<i64> {
        let projects = self.inner.projects.read().await;
        Ok(projects.iter().filter(|p| filter.matches(p)).count() as i64)
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn insert(&self, record: RefreshTokenRecord) -> StoreResult<()> {
        self.inner
            .refresh_tokens
            .write()
            .await
            .insert(record.jti, record);
        Ok(())
    }

    async fn consume(&self, jti: Uuid) -> StoreResult<ConsumeOutcome> {
        let now = Utc::now();
        let mut tokens = self.inner.refresh_tokens.write().await;
        let Some(record) = tokens.get_mut(&jti) else {
            return Ok(ConsumeOutcome::Rejected);
        };

        if record.revoked_at.is_some() {
            return Ok(ConsumeOutcome::Reused {
                user_id: record.user_id,
            });
        }
        if !record.is_usable(now) {
            return Ok(ConsumeOutcome::Rejected);
        }

        record.revoked_at = Some(now);
        Ok(ConsumeOutcome::Consumed {
            user_id: record.user_id,
        })
    }

    async fn revoke(&self, jti: Uuid) -> StoreResult<bool> {
        let mut tokens = self.inner.refresh_tokens.write().await;
        match tokens.get_mut(&jti) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let now = Utc::now();
        let mut tokens = self.inner.refresh_tokens.write().await;
        let mut revoked = 0;
        for record in tokens.values_mut() {
            if record.user_id == user_id && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::super::Store;
    use super::*;
    use crate::models::task::NewTaskInput;
    use crate::models::user::UserRole;
    use chrono::Duration;
    use serde_json::json;

    fn new_user(username: &str, email: &str) -> CreateUser {
        CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$test".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role: UserRole::User,
        }
    }

    fn new_task(title: &str, status: &str, created_by: Uuid) -> CreateTask {
        let input: NewTaskInput = serde_json::from_value(json!({
            "title": title,
            "status": status,
            "project": "core",
        }))
        .unwrap();
        input.into_create(created_by).unwrap()
    }

    #[tokio::test]
    async fn test_user_uniqueness_is_case_insensitive() {
        let store = Store::memory();
        store.users.create(new_user("alice", "alice@example.com")).await.unwrap();

        let dup_name = store.users.create(new_user("ALICE", "other@example.com")).await;
        assert!(matches!(dup_name, Err(StoreError::Duplicate { field: "username" })));

        let dup_email = store.users.create(new_user("bob", "Alice@Example.com")).await;
        assert!(matches!(dup_email, Err(StoreError::Duplicate { field: "email" })));
    }

    #[tokio::test]
    async fn test_uniqueness_folds_non_ascii_case() {
        let store = Store::memory();
        let jorg = store
            .users
            .create(new_user("jörg", "jörg@example.com"))
            .await
            .unwrap();

        let dup_email = store.users.create(new_user("joerg", "JÖRG@example.com")).await;
        assert!(matches!(dup_email, Err(StoreError::Duplicate { field: "email" })));

        let dup_name = store.users.create(new_user("JÖRG", "other@example.com")).await;
        assert!(matches!(dup_name, Err(StoreError::Duplicate { field: "username" })));

        let found = store.users.find_by_login("JÖRG").await.unwrap().unwrap();
        assert_eq!(found.id, jorg.id);
    }

    #[tokio::test]
    async fn test_find_by_login() {
        let store = Store::memory();
        let alice = store.users.create(new_user("alice", "alice@example.com")).await.unwrap();

        let by_name = store.users.find_by_login("Alice").await.unwrap().unwrap();
        let by_email = store.users.find_by_login("ALICE@example.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, alice.id);
        assert_eq!(by_email.id, alice.id);
        assert!(store.users.find_by_login("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_email_conflict() {
        let store = Store::memory();
        store.users.create(new_user("alice", "alice@example.com")).await.unwrap();
        let bob = store.users.create(new_user("bob", "bob@example.com")).await.unwrap();

        let result = store
            .users
            .update(
                bob.id,
                UpdateUser {
                    email: Some("alice@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::Duplicate { field: "email" })));

        let missing = store.users.update(Uuid::new_v4(), UpdateUser::default()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_task_listing_newest_first_with_totals() {
        let store = Store::memory();
        let creator = Uuid::new_v4();
        for i in 0..12 {
            let status = if i % 3 == 0 { "completed" } else { "todo" };
            store
                .tasks
                .create(new_task(&format!("task {}", i), status, creator))
                .await
                .unwrap();
        }

        let completed = TaskFilter {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        let (tasks, total) = store.tasks.list(&completed, Page::new(1, 10)).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0].title, "task 9");
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));

        let (page2, total) = store
            .tasks
            .list(&TaskFilter::default(), Page::new(2, 10))
            .await
            .unwrap();
        assert_eq!(total, 12);
        assert_eq!(page2.len(), 2);
        assert_eq!(page2[1].title, "task 0");
    }

    #[tokio::test]
    async fn test_group_counts_skip_empty_groups() {
        let store = Store::memory();
        let creator = Uuid::new_v4();
        store.tasks.create(new_task("a", "todo", creator)).await.unwrap();
        store.tasks.create(new_task("b", "todo", creator)).await.unwrap();
        store.tasks.create(new_task("c", "review", creator)).await.unwrap();

        let by_status = store.tasks.count_by_status().await.unwrap();
        assert_eq!(by_status, vec![(TaskStatus::Todo, 2), (TaskStatus::Review, 1)]);

        let by_priority = store.tasks.count_by_priority().await.unwrap();
        assert_eq!(by_priority, vec![(TaskPriority::Medium, 3)]);
    }

    #[tokio::test]
    async fn test_task_update_delete_and_comments() {
        let store = Store::memory();
        let creator = Uuid::new_v4();
        let task = store.tasks.create(new_task("a", "todo", creator)).await.unwrap();

        let updated = store
            .tasks
            .update(
                task.id,
                UpdateTask {
                    status: Some(TaskStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);

        let comment = Comment {
            id: Uuid::new_v4(),
            author: creator,
            text: "looks good".to_string(),
            created_at: Utc::now(),
        };
        let commented = store.tasks.add_comment(task.id, comment).await.unwrap().unwrap();
        assert_eq!(commented.comments.len(), 1);

        assert!(store.tasks.delete(task.id).await.unwrap());
        assert!(!store.tasks.delete(task.id).await.unwrap());
        assert!(store.tasks.find_by_id(task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_single_use() {
        let store = Store::memory();
        let user_id = Uuid::new_v4();
        let jti = Uuid::new_v4();
        let other = Uuid::new_v4();
        let expires = Utc::now() + Duration::days(7);

        for id in [jti, other] {
            let record = RefreshTokenRecord::new(id, user_id, expires);
            store.refresh_tokens.insert(record).await.unwrap();
        }

        assert_eq!(
            store.refresh_tokens.consume(jti).await.unwrap(),
            ConsumeOutcome::Consumed { user_id }
        );
        assert_eq!(
            store.refresh_tokens.consume(jti).await.unwrap(),
            ConsumeOutcome::Reused { user_id }
        );
        assert_eq!(
            store.refresh_tokens.consume(Uuid::new_v4()).await.unwrap(),
            ConsumeOutcome::Rejected
        );

        assert_eq!(store.refresh_tokens.revoke_all_for_user(user_id).await.unwrap(), 1);
        assert_eq!(
            store.refresh_tokens.consume(other).await.unwrap(),
            ConsumeOutcome::Reused { user_id }
        );
    }

    #[tokio::test]
    async fn test_expired_refresh_token_rejected() {
        let store = Store::memory();
        let jti = Uuid::new_v4();
        let expired = Utc::now() - Duration::minutes(1);
        let record = RefreshTokenRecord::new(jti, Uuid::new_v4(), expired);
        store.refresh_tokens.insert(record).await.unwrap();

        assert_eq!(store.refresh_tokens.consume(jti).await.unwrap(), ConsumeOutcome::Rejected);
        assert!(store.refresh_tokens.revoke(jti).await.unwrap());
        assert!(!store.refresh_tokens.revoke(jti).await.unwrap());
    }
}
