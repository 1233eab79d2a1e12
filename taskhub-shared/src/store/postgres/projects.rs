use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::project::{CreateProject, Project, ProjectFilter, UpdateProject};
use crate::models::Page;
use crate::store::{ProjectRepository, StoreResult};

const PROJECT_COLUMNS: &str = "id, name, description, status, owner_id, team, start_date, \
                               end_date, budget, progress, created_at, updated_at";

pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProjectFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(owner) = filter.owner {
        builder.push(" AND owner_id = ").push_bind(owner);
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn list(&self, filter: &ProjectFilter, page: Page) -> StoreResult<(Vec<Project>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM projects", PROJECT_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let projects = select.build_query_as::<Project>().fetch_all(&self.pool).await?;

        Ok((projects, total))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(project)
    }

    async fn create(&self, data: CreateProject) -> StoreResult<Project> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (id, name, description, status, owner_id, team, start_date,
                                  end_date, budget, progress)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.status)
        .bind(data.owner_id)
        .bind(&data.team)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.budget)
        .bind(data.progress)
        .fetch_one(&self.pool)
        .await?;

        Ok(project)
    }

    async fn update(&self, id: Uuid, data: UpdateProject) -> StoreResult<Option<Project>> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE projects SET updated_at = NOW()");
        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(description) = data.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }
        if let Some(team) = data.team {
            builder.push(", team = ").push_bind(team);
        }
        if let Some(start_date) = data.start_date {
            builder.push(", start_date = ").push_bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            builder.push(", end_date = ").push_bind(end_date);
        }
        if let Some(budget) = data.budget {
            builder.push(", budget = ").push_bind(budget);
        }
        if let Some(progress) = data.progress {
            builder.push(", progress = ").push_bind(progress);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {}", PROJECT_COLUMNS));

        let project = builder
            .build_query_as::<Project>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(project)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, filter: &ProjectFilter) -> StoreResult<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects");
        push_filter(&mut builder, filter);
        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(total)
    }
}
