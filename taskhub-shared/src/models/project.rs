//! Project model
//!
//! A project has one owner and a team of members, all stored as user ids and
//! expanded on read. Members pointing at deleted users are dropped from the
//! team list; a deleted owner expands to `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::fields::{deserialize_some, parse_date_field, parse_user_ref, parse_user_refs, Page};
use super::user::UserSummary;
use crate::validation::{FieldError, UnknownVariant, Violations};

/// Default page size for `GET /api/projects`
pub const DEFAULT_PROJECT_PAGE_SIZE: u32 = 100;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "project_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 5] = [
        ProjectStatus::Planning,
        ProjectStatus::Active,
        ProjectStatus::OnHold,
        ProjectStatus::Completed,
        ProjectStatus::Cancelled,
    ];
    pub const VARIANTS: &'static [&'static str] =
        &["planning", "active", "on-hold", "completed", "cancelled"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on-hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
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

/// Stored project record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub owner_id: Uuid,
    pub team: Vec<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub budget: Option<f64>,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Owner first, then team members
    pub fn referenced_users(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(self.team.len() + 1);
        ids.push(self.owner_id);
        ids.extend(self.team.iter().copied());
        ids
    }

    /// Applies a partial update in place and refreshes `updated_at`
    pub fn apply(&mut self, update: UpdateProject) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(team) = update.team {
            self.team = team;
        }
        if let Some(start_date) = update.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            self.end_date = end_date;
        }
        if let Some(budget) = update.budget {
            self.budget = budget;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub owner_id: Uuid,
    pub team: Vec<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub budget: Option<f64>,
    pub progress: i32,
}

impl CreateProject {
    pub fn into_project(self) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            status: self.status,
            owner_id: self.owner_id,
            team: self.team,
            start_date: self.start_date,
            end_date: self.end_date,
            budget: self.budget,
            progress: self.progress,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `Some(None)` clears `end_date` or `budget`
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub team: Option<Vec<Uuid>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub budget: Option<Option<f64>>,
    pub progress: Option<i32>,
}

impl UpdateProject {
    /// Checks the date ordering the update would leave on `existing`
    pub fn check_against(&self, existing: &Project) -> Result<(), Vec<FieldError>> {
        let start = self.start_date.unwrap_or(existing.start_date);
        let end = match self.end_date {
            Some(end) => end,
            None => existing.end_date,
        };

        let mut violations = Violations::new();
        check_date_order(&mut violations, start, end);
        violations.finish()
    }
}

fn check_date_order(violations: &mut Violations, start: DateTime<Utc>, end: Option<DateTime<Utc>>) {
    if let Some(end) = end {
        if end < start {
            violations.push("endDate", "End date cannot be before start date");
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub owner: Option<Uuid>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        self.status.map_or(true, |s| project.status == s)
            && self.owner.map_or(true, |o| project.owner_id == o)
    }
}

/// `POST /api/projects` body; any `owner` field is ignored
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct NewProjectInput {
    #[validate(length(min = 1, max = 100, message = "Name is required (max 100 characters)"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    pub status: Option<String>,
    pub team: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,

    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    pub budget: Option<f64>,

    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,
}

impl NewProjectInput {
    pub fn into_create(self, owner_id: Uuid) -> Result<CreateProject, Vec<FieldError>> {
        let input = NewProjectInput {
            name: self.name.trim().to_string(),
            ..self
        };

        let mut violations = Violations::check(&input);
        let status = violations.parse_enum("status", input.status.as_deref());
        let team = parse_user_refs(&mut violations, "team", &input.team);
        let start_date =
            parse_date_field(&mut violations, "startDate", input.start_date.as_deref());
        let end_date = parse_date_field(&mut violations, "endDate", input.end_date.as_deref());

        match start_date {
            Some(start) => check_date_order(&mut violations, start, end_date),
            None if input.start_date.as_deref().map_or(true, |s| s.trim().is_empty()) => {
                violations.push("startDate", "Start date is required");
            }
            None => {}
        }
        violations.finish()?;
        let start_date =
            start_date.ok_or_else(|| vec![FieldError::new("startDate", "Start date is required")])?;

        Ok(CreateProject {
            name: input.name,
            description: input.description,
            status: status.unwrap_or_default(),
            owner_id,
            team,
            start_date,
            end_date,
            budget: input.budget,
            progress: input.progress.unwrap_or(0),
        })
    }
}

/// `PUT /api/projects/:id` body; only supplied fields change
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectPatchInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub status: Option<String>,
    pub team: Option<Vec<String>>,
    pub start_date: Option<String>,

    #[serde(deserialize_with = "deserialize_some")]
    pub end_date: Option<Option<String>>,

    #[serde(deserialize_with = "deserialize_some")]
    pub budget: Option<Option<f64>>,

    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,
}

impl ProjectPatchInput {
    /// Validates the patch on its own; date ordering against the stored
    /// project is checked with [`UpdateProject::check_against`]
    pub fn into_update(self) -> Result<UpdateProject, Vec<FieldError>> {
        let input = ProjectPatchInput {
            name: self.name.map(|n| n.trim().to_string()),
            ..self
        };

        let mut violations = Violations::check(&input);
        let status = violations.parse_enum("status", input.status.as_deref());
        let team = input
            .team
            .as_ref()
            .map(|team| parse_user_refs(&mut violations, "team", team));
        let start_date =
            parse_date_field(&mut violations, "startDate", input.start_date.as_deref());
        let end_date = input.end_date.as_ref().map(|raw| match raw {
            Some(raw) => parse_date_field(&mut violations, "endDate", Some(raw)),
            None => None,
        });
        if let Some(Some(budget)) = input.budget {
            if budget < 0.0 {
                violations.push("budget", "Budget cannot be negative");
            }
        }

        violations.into_result(UpdateProject {
            name: input.name,
            description: input.description,
            status,
            team,
            start_date,
            end_date,
            budget: input.budget,
            progress: input.progress,
        })
    }
}

/// `GET /api/projects` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectQuery {
    pub status: Option<String>,
    pub owner: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ProjectQuery {
    pub fn into_filter(self) -> Result<(ProjectFilter, Page), Vec<FieldError>> {
        let mut violations = Violations::new();
        let filter = ProjectFilter {
            status: violations.parse_enum("status", self.status.as_deref()),
            owner: parse_user_ref(&mut violations, "owner", self.owner.as_deref()),
        };
        let page = Page::parse(
            &mut violations,
            self.page.as_deref(),
            self.limit.as_deref(),
            DEFAULT_PROJECT_PAGE_SIZE,
        );
        violations.into_result((filter, page))
    }
}

/// Project as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub owner: Option<UserSummary>,
    pub team: Vec<UserSummary>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub budget: Option<f64>,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectView {
    pub fn build(project: Project, users: &HashMap<Uuid, UserSummary>) -> Self {
        ProjectView {
            id: project.id,
            name: project.name,
            description: project.description,
            status: project.status,
            owner: users.get(&project.owner_id).cloned(),
            team: project
                .team
                .iter()
                .filter_map(|id| users.get(id).cloned())
                .collect(),
            start_date: project.start_date,
            end_date: project.end_date,
            budget: project.budget,
            progress: project.progress,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn project(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Project {
        CreateProject {
            name: "Website".to_string(),
            description: String::new(),
            status: ProjectStatus::Active,
            owner_id: Uuid::new_v4(),
            team: vec![],
            start_date: start,
            end_date: end,
            budget: None,
            progress: 0,
        }
        .into_project()
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_value(ProjectStatus::OnHold).unwrap(), "on-hold");
        assert_eq!("on-hold".parse::<ProjectStatus>().unwrap(), ProjectStatus::OnHold);
        assert!("paused".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn test_create_requires_start_date() {
        let input: NewProjectInput =
            serde_json::from_value(json!({ "name": "Website" })).unwrap();
        let errors = input.into_create(Uuid::new_v4()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "startDate");
    }

    #[test]
    fn test_create_defaults_and_owner() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let input: NewProjectInput = serde_json::from_value(json!({
            "name": "Website",
            "startDate": "2025-01-01",
            "team": [member, member],
            "owner": Uuid::new_v4(),
        }))
        .unwrap();

        let project = input.into_create(owner).unwrap();
        assert_eq!(project.owner_id, owner);
        assert_eq!(project.team, vec![member]);
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.progress, 0);
    }

    #[test]
    fn test_create_rejects_bad_ranges() {
        let input: NewProjectInput = serde_json::from_value(json!({
            "name": "Website",
            "startDate": "2025-02-01",
            "endDate": "2025-01-01",
            "budget": -5.0,
            "progress": 101,
        }))
        .unwrap();

        let errors = input.into_create(Uuid::new_v4()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"endDate"));
        assert!(fields.contains(&"budget"));
        assert!(fields.contains(&"progress"));
    }

    #[test]
    fn test_patch_checked_against_existing_dates() {
        let start = Utc::now();
        let existing = project(start, None);

        let patch: ProjectPatchInput = serde_json::from_value(json!({
            "endDate": (start - Duration::days(1)).to_rfc3339(),
        }))
        .unwrap();
        let update = patch.into_update().unwrap();
        assert!(update.check_against(&existing).is_err());

        let clear: ProjectPatchInput =
            serde_json::from_value(json!({ "endDate": null, "budget": null })).unwrap();
        let update = clear.into_update().unwrap();
        assert_eq!(update.end_date, Some(None));
        assert_eq!(update.budget, Some(None));
        assert!(update.check_against(&existing).is_ok());
    }

    #[test]
    fn test_apply_update() {
        let mut existing = project(Utc::now(), None);
        existing.budget = Some(10.0);
        existing.apply(UpdateProject {
            progress: Some(40),
            budget: Some(None),
            ..Default::default()
        });
        assert_eq!(existing.progress, 40);
        assert_eq!(existing.budget, None);
        assert_eq!(existing.name, "Website");
    }

    #[test]
    fn test_view_drops_dangling_team_members() {
        let mut existing = project(Utc::now(), None);
        let member = Uuid::new_v4();
        existing.team = vec![member, Uuid::new_v4()];

        let users = HashMap::from([(
            member,
            UserSummary {
                id: member,
                username: "bob".to_string(),
                first_name: "Bob".to_string(),
                last_name: "Builder".to_string(),
            },
        )]);
        let view = ProjectView::build(existing, &users);

        assert!(view.owner.is_none());
        assert_eq!(view.team.len(), 1);
        assert_eq!(view.team[0].username, "bob");
    }

    #[test]
    fn test_filter() {
        let existing = project(Utc::now(), None);
        let filter = ProjectFilter {
            status: Some(ProjectStatus::Active),
            owner: Some(existing.owner_id),
        };
        assert!(filter.matches(&existing));

        let other = ProjectFilter {
            owner: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(!other.matches(&existing));
    }
}
