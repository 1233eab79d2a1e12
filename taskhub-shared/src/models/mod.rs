//! Domain models for TaskHub
//!
//! Each entity module carries four kinds of types:
//!
//! - the stored record (`User`, `Task`, `Project`), mapped with `sqlx::FromRow`
//! - write payloads consumed by the store (`CreateTask`, `UpdateTask`, ...)
//! - client-facing inputs that validate and convert into write payloads
//!   (`NewTaskInput::into_create`, `TaskPatchInput::into_update`, ...)
//! - response views with references expanded (`TaskView`, `ProjectView`)
//!
//! # Models
//!
//! - `user`: Accounts, roles and the public user projections
//! - `task`: Tasks with embedded comments and attachments
//! - `project`: Projects with an owner and a team
//! - `fields`: Shared serde helpers, date parsing and pagination
//!
//! # Example
//!
//! ```
//! use taskhub_shared::models::task::NewTaskInput;
//! use uuid::Uuid;
//!
//! let input: NewTaskInput = serde_json::from_value(serde_json::json!({
//!     "title": "Write release notes",
//!     "project": "website",
//!     "priority": "high",
//!     "tags": ["docs", "docs"]
//! })).unwrap();
//!
//! let task = input.into_create(Uuid::new_v4()).unwrap();
//! assert_eq!(task.tags, vec!["docs".to_string()]);
//! ```

pub mod fields;
pub mod project;
pub mod task;
pub mod user;

pub use fields::Page;
