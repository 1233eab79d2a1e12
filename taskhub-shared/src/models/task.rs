//! Task model
//!
//! Tasks carry their comments and attachments inline (JSONB columns in
//! PostgreSQL). User references (`assigned_to`, `created_by`, comment authors)
//! are stored as bare ids and expanded into [`UserSummary`] projections when a
//! [`TaskView`] is built; a reference to a deleted user expands to `null`.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'review', 'completed');
//! CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
//!
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY,
//!     title VARCHAR(200) NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     status task_status NOT NULL DEFAULT 'todo',
//!     priority task_priority NOT NULL DEFAULT 'medium',
//!     assigned_to UUID,
//!     created_by UUID NOT NULL,
//!     project VARCHAR(100) NOT NULL,
//!     tags TEXT[] NOT NULL DEFAULT '{}',
//!     due_date TIMESTAMPTZ,
//!     estimated_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
//!     actual_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
//!     attachments JSONB NOT NULL DEFAULT '[]',
//!     comments JSONB NOT NULL DEFAULT '[]',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::fields::{deserialize_some, parse_date_field, parse_user_ref, Page};
use super::user::UserSummary;
use crate::validation::{normalize_tags, FieldError, UnknownVariant, Violations};

/// Default page size for `GET /api/tasks`
pub const DEFAULT_TASK_PAGE_SIZE: u32 = 10;

/// Task workflow state
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Completed,
    ];
    pub const VARIANTS: &'static [&'static str] = &["todo", "in-progress", "review", "completed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Review => "review",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(UnknownVariant {
                expected: Self::VARIANTS,
            })
    }
}

/// Task urgency
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];
    pub const VARIANTS: &'static [&'static str] = &["low", "medium", "high", "urgent"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or(UnknownVariant {
                expected: Self::VARIANTS,
            })
    }
}

/// File reference attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Stored comment; `author` is a user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Stored task record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub project: String,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub attachments: Json<Vec<Attachment>>,
    pub comments: Json<Vec<Comment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Every user id this task points at (creator, assignee, comment authors)
    pub fn referenced_users(&self) -> Vec<Uuid> {
        let mut ids = vec![self.created_by];
        ids.extend(self.assigned_to);
        ids.extend(self.comments.iter().map(|c| c.author));
        ids
    }

    /// Applies a partial update in place and refreshes `updated_at`
    pub fn apply(&mut self, update: UpdateTask) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(assigned_to) = update.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(project) = update.project {
            self.project = project;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = due_date;
        }
        if let Some(hours) = update.estimated_hours {
            self.estimated_hours = hours;
        }
        if let Some(hours) = update.actual_hours {
            self.actual_hours = hours;
        }
        self.updated_at = Utc::now();
    }
}

/// Insert payload
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub project: String,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: f64,
    pub actual_hours: f64,
}

impl CreateTask {
    /// Materialises the stored record with a fresh id and timestamps
    pub fn into_task(self) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
            project: self.project,
            tags: self.tags,
            due_date: self.due_date,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            attachments: Json(Vec::new()),
            comments: Json(Vec::new()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update
///
/// Outer `None` leaves a field untouched; for nullable columns `Some(None)`
/// clears the value.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Option<Uuid>>,
    pub project: Option<String>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

/// Exact-match list filter; every field is independent and optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project: Option<String>,
    pub assigned_to: Option<Uuid>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
            && self.project.as_ref().map_or(true, |p| &task.project == p)
            && self.assigned_to.map_or(true, |a| task.assigned_to == Some(a))
    }
}

/// `POST /api/tasks` body
///
/// A `createdBy` field in the body is ignored; the creator is always the
/// authenticated caller.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct NewTaskInput {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Project is required (max 100 characters)"))]
    pub project: String,

    pub tags: Vec<String>,
    pub due_date: Option<String>,

    #[validate(range(min = 0.0, message = "Estimated hours cannot be negative"))]
    pub estimated_hours: Option<f64>,

    #[validate(range(min = 0.0, message = "Actual hours cannot be negative"))]
    pub actual_hours: Option<f64>,
}

impl NewTaskInput {
    pub fn into_create(self, created_by: Uuid) -> Result<CreateTask, Vec<FieldError>> {
        let input = NewTaskInput {
            title: self.title.trim().to_string(),
            project: self.project.trim().to_string(),
            ..self
        };

        let mut violations = Violations::check(&input);
        let status = violations.parse_enum("status", input.status.as_deref());
        let priority = violations.parse_enum("priority", input.priority.as_deref());
        let assigned_to =
            parse_user_ref(&mut violations, "assignedTo", input.assigned_to.as_deref());
        let due_date = parse_date_field(&mut violations, "dueDate", input.due_date.as_deref());
        let tags = normalize_tags(input.tags, &mut violations);

        violations.into_result(CreateTask {
            title: input.title,
            description: input.description,
            status: status.unwrap_or_default(),
            priority: priority.unwrap_or_default(),
            assigned_to,
            created_by,
            project: input.project,
            tags,
            due_date,
            estimated_hours: input.estimated_hours.unwrap_or(0.0),
            actual_hours: input.actual_hours.unwrap_or(0.0),
        })
    }
}

/// `PUT /api/tasks/:id` body; only supplied fields change
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskPatchInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub status: Option<String>,
    pub priority: Option<String>,

    #[serde(deserialize_with = "deserialize_some")]
    pub assigned_to: Option<Option<String>>,

    #[validate(length(min = 1, max = 100, message = "Project must be 1-100 characters"))]
    pub project: Option<String>,

    pub tags: Option<Vec<String>>,

    #[serde(deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<String>>,

    #[validate(range(min = 0.0, message = "Estimated hours cannot be negative"))]
    pub estimated_hours: Option<f64>,

    #[validate(range(min = 0.0, message = "Actual hours cannot be negative"))]
    pub actual_hours: Option<f64>,
}

impl TaskPatchInput {
    pub fn into_update(self) -> Result<UpdateTask, Vec<FieldError>> {
        let input = TaskPatchInput {
            title: self.title.map(|t| t.trim().to_string()),
            project: self.project.map(|p| p.trim().to_string()),
            ..self
        };

        let mut violations = Violations::check(&input);
        let status = violations.parse_enum("status", input.status.as_deref());
        let priority = violations.parse_enum("priority", input.priority.as_deref());

        let assigned_to = input.assigned_to.map(|raw| match raw {
            Some(raw) => parse_user_ref(&mut violations, "assignedTo", Some(&raw)),
            None => None,
        });
        let due_date = input.due_date.map(|raw| match raw {
            Some(raw) => parse_date_field(&mut violations, "dueDate", Some(&raw)),
            None => None,
        });
        let tags = input.tags.map(|tags| normalize_tags(tags, &mut violations));

        violations.into_result(UpdateTask {
            title: input.title,
            description: input.description,
            status,
            priority,
            assigned_to,
            project: input.project,
            tags,
            due_date,
            estimated_hours: input.estimated_hours,
            actual_hours: input.actual_hours,
        })
    }
}

/// `POST /api/tasks/:id/comments` body
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CommentInput {
    #[validate(length(min = 1, max = 1000, message = "Comment text must be 1-1000 characters"))]
    pub text: String,
}

impl CommentInput {
    pub fn into_comment(self, author: Uuid) -> Result<Comment, Vec<FieldError>> {
        let input = CommentInput {
            text: self.text.trim().to_string(),
        };
        Violations::check(&input).into_result(Comment {
            id: Uuid::new_v4(),
            author,
            text: input.text,
            created_at: Utc::now(),
        })
    }
}

/// `POST /api/tasks/:id/attachments` body
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AttachmentInput {
    #[validate(length(min = 1, max = 255, message = "Filename must be 1-255 characters"))]
    pub filename: String,

    #[validate(url(message = "Invalid attachment URL"))]
    pub url: String,
}

impl AttachmentInput {
    pub fn into_attachment(self) -> Result<Attachment, Vec<FieldError>> {
        Violations::check(&self).into_result(Attachment {
            filename: self.filename,
            url: self.url,
            uploaded_at: Utc::now(),
        })
    }
}

/// `GET /api/tasks` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub project: Option<String>,
    pub assigned_to: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl TaskQuery {
    pub fn into_filter(self) -> Result<(TaskFilter, Page), Vec<FieldError>> {
        let mut violations = Violations::new();
        let filter = TaskFilter {
            status: violations.parse_enum("status", self.status.as_deref()),
            priority: violations.parse_enum("priority", self.priority.as_deref()),
            project: self
                .project
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            assigned_to: parse_user_ref(&mut violations, "assignedTo", self.assigned_to.as_deref()),
        };
        let page = Page::parse(
            &mut violations,
            self.page.as_deref(),
            self.limit.as_deref(),
            DEFAULT_TASK_PAGE_SIZE,
        );
        violations.into_result((filter, page))
    }
}

/// Comment with its author expanded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub author: Option<UserSummary>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Task as returned to clients, with user references expanded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<UserSummary>,
    pub created_by: Option<UserSummary>,
    pub project: String,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub attachments: Vec<Attachment>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    /// Builds the view; ids missing from `users` expand to `None`
    pub fn build(task: Task, users: &HashMap<Uuid, UserSummary>) -> Self {
        let lookup = |id: Uuid| users.get(&id).cloned();
        TaskView {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            assigned_to: task.assigned_to.and_then(lookup),
            created_by: lookup(task.created_by),
            project: task.project,
            tags: task.tags,
            due_date: task.due_date,
            estimated_hours: task.estimated_hours,
            actual_hours: task.actual_hours,
            attachments: task.attachments.0,
            comments: task
                .comments
                .0
                .into_iter()
                .map(|c| CommentView {
                    id: c.id,
                    author: lookup(c.author),
                    text: c.text,
                    created_at: c.created_at,
                })
                .collect(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
