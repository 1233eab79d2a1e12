//! Persistence layer
//!
//! Repository traits for users, tasks, projects and refresh tokens, with two
//! implementations:
//!
//! - [`postgres`]: `sqlx` queries against the schema in `migrations/`
//! - [`memory`]: process-local maps behind `tokio::sync::RwLock`, used by the
//!   test suite and by `DATABASE_URL=memory://`
//!
//! Handlers only ever see the cloneable [`Store`] bundle carried in the
//! application state.
//!
//! # Example
//!
//! ```
//! use taskhub_shared::models::task::{NewTaskInput, TaskFilter};
//! use taskhub_shared::models::Page;
//! use taskhub_shared::store::Store;
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::memory();
//! let input: NewTaskInput = serde_json::from_value(serde_json::json!({
//!     "title": "Triage bugs",
//!     "project": "core"
//! }))?;
//! let create = input.into_create(Uuid::new_v4()).map_err(|_| "invalid")?;
//! store.tasks.create(create).await?;
//!
//! let (tasks, total) = store.tasks.list(&TaskFilter::default(), Page::new(1, 10)).await?;
//! assert_eq!((tasks.len(), total), (1, 1));
//! # Ok(())
//! # }
//! ```

pub mod expand;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::project::{CreateProject, Project, ProjectFilter, UpdateProject};
use crate::models::task::{
    Attachment, Comment, CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask,
};
use crate::models::user::{CreateUser, UpdateUser, User, UserFilter, UserSummary};
use crate::models::Page;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; `field` names the client field
    #[error("{field} already exists")]
    Duplicate { field: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user; username/email collisions are `Duplicate`
    async fn create(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive lookup by username or email
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>>;

    /// Newest first
    async fn list(&self, filter: &UserFilter, page: Page) -> StoreResult<(Vec<User>, i64)>;

    async fn update(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn touch_last_login(&self, id: Uuid) -> StoreResult<()>;

    /// Display projections for the given ids; unknown ids are skipped
    async fn summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Newest first, with the total number of matches
    async fn list(&self, filter: &TaskFilter, page: Page) -> StoreResult<(Vec<Task>, i64)>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn create(&self, data: CreateTask) -> StoreResult<Task>;

    async fn update(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn add_comment(&self, id: Uuid, comment: Comment) -> StoreResult<Option<Task>>;

    async fn add_attachment(&self, id: Uuid, attachment: Attachment) -> StoreResult<Option<Task>>;

    async fn count(&self, filter: &TaskFilter) -> StoreResult<i64>;

    /// Only statuses with at least one task appear
    async fn count_by_status(&self) -> StoreResult<Vec<(TaskStatus, i64)>>;

    /// Only priorities with at least one task appear
    async fn count_by_priority(&self) -> StoreResult<Vec<(TaskPriority, i64)>>;

    /// The `limit` most recently created tasks
    async fn recent(&self, limit: u32) -> StoreResult<Vec<Task>>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Newest first, with the total number of matches
    async fn list(&self, filter: &ProjectFilter, page: Page) -> StoreResult<(Vec<Project>, i64)>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Project>>;

    async fn create(&self, data: CreateProject) -> StoreResult<Project>;

    async fn update(&self, id: Uuid, data: UpdateProject) -> StoreResult<Option<Project>>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn count(&self, filter: &ProjectFilter) -> StoreResult<i64>;
}

/// Persisted refresh token (`jti` of a refresh JWT)
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub jti: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(jti: Uuid, user_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            jti,
            user_id,
            expires_at,
            revoked_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Result of presenting a refresh token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The token was live and is now revoked
    Consumed { user_id: Uuid },

    /// The token had already been used or revoked
    Reused { user_id: Uuid },

    /// Unknown or expired
    Rejected,
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, record: RefreshTokenRecord) -> StoreResult<()>;

    /// Atomically revokes a live token
    async fn consume(&self, jti: Uuid) -> StoreResult<ConsumeOutcome>;

    /// Revokes a token; false when it was unknown or already revoked
    async fn revoke(&self, jti: Uuid) -> StoreResult<bool>;

    /// Revokes every live token of a user, returning how many were revoked
    async fn revoke_all_for_user(&self, user_id: Uuid) -> StoreResult<u64>;
}

#[derive(Clone)]
enum Backend {
    Postgres(PgPool),
    Memory,
}

/// Repository bundle injected into handlers through the application state
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    backend: Backend,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgUserRepository::new(pool.clone())),
            tasks: Arc::new(postgres::PgTaskRepository::new(pool.clone())),
            projects: Arc::new(postgres::PgProjectRepository::new(pool.clone())),
            refresh_tokens: Arc::new(postgres::PgRefreshTokenRepository::new(pool.clone())),
            backend: Backend::Postgres(pool),
        }
    }

    pub fn memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            users: Arc::new(store.clone()),
            tasks: Arc::new(store.clone()),
            projects: Arc::new(store.clone()),
            refresh_tokens: Arc::new(store),
            backend: Backend::Memory,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Postgres(_) => "postgres",
            Backend::Memory => "memory",
        }
    }

    /// Checks that the backing database answers
    pub async fn ping(&self) -> StoreResult<()> {
        match &self.backend {
            Backend::Postgres(pool) => Ok(crate::db::pool::health_check(pool).await?),
            Backend::Memory => Ok(()),
        }
    }

    /// The PostgreSQL pool, when running against PostgreSQL
    pub fn pool(&self) -> Option<&PgPool> {
        match &self.backend {
            Backend::Postgres(pool) => Some(pool),
            Backend::Memory => None,
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend_name())
            .finish()
    }
}
