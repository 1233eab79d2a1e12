use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::task::{
    Attachment, Comment, CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask,
};
use crate::models::Page;
use crate::store::{StoreResult, TaskRepository};

const TASK_COLUMNS: &str = "id, title, description, status, priority, assigned_to, created_by, \
                            project, tags, due_date, estimated_hours, actual_hours, attachments, \
                            comments, created_at, updated_at";

pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ").push_bind(priority);
    }
    if let Some(project) = &filter.project {
        builder.push(" AND project = ").push_bind(project.clone());
    }
    if let Some(assigned_to) = filter.assigned_to {
        builder.push(" AND assigned_to = ").push_bind(assigned_to);
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn list(&self, filter: &TaskFilter, page: Page) -> StoreResult<(Vec<Task>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let tasks = select.build_query_as::<Task>().fetch_all(&self.pool).await?;

        Ok((tasks, total))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn create(&self, data: CreateTask) -> StoreResult<Task> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (id, title, description, status, priority, assigned_to, created_by,
                               project, tags, due_date, estimated_hours, actual_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.assigned_to)
        .bind(data.created_by)
        .bind(&data.project)
        .bind(&data.tags)
        .bind(data.due_date)
        .bind(data.estimated_hours)
        .bind(data.actual_hours)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");
        if let Some(title) = data.title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }
        if let Some(priority) = data.priority {
            builder.push(", priority = ").push_bind(priority);
        }
        if let Some(assigned_to) = data.assigned_to {
            builder.push(", assigned_to = ").push_bind(assigned_to);
        }
        if let Some(project) = data.project {
            builder.push(", project = ").push_bind(project);
        }
        if let Some(tags) = data.tags {
            builder.push(", tags = ").push_bind(tags);
        }
        if let Some(due_date) = data.due_date {
            builder.push(", due_date = ").push_bind(due_date);
        }
        if let Some(hours) = data.estimated_hours {
            builder.push(", estimated_hours = ").push_bind(hours);
        }
        if let Some(hours) = data.actual_hours {
            builder.push(", actual_hours = ").push_bind(hours);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {}", TASK_COLUMNS));

        let task = builder
            .build_query_as::<Task>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_comment(&self, id: Uuid, comment: Comment) -> StoreResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET comments = comments || $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(Json(vec![comment]))
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn add_attachment(&self, id: Uuid, attachment: Attachment) -> StoreResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET attachments = attachments || $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(Json(vec![attachment]))
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn count(&self, filter: &TaskFilter) -> StoreResult<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_filter(&mut builder, filter);
        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(total)
    }

    async fn count_by_status(&self) -> StoreResult<Vec<(TaskStatus, i64)>> {
        // enum columns sort in declaration order
        let rows = sqlx::query_as::<_, (TaskStatus, i64)>(
            "SELECT status, COUNT(*) FROM tasks GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count_by_priority(&self) -> StoreResult<Vec<(TaskPriority, i64)>> {
        let rows = sqlx::query_as::<_, (TaskPriority, i64)>(
            "SELECT priority, COUNT(*) FROM tasks GROUP BY priority ORDER BY priority",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn recent(&self, limit: u32) -> StoreResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks ORDER BY created_at DESC LIMIT $1",
            TASK_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }
}
