use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::map_unique_violation;
use crate::models::user::{CreateUser, UpdateUser, User, UserFilter, UserSummary};
use crate::models::Page;
use crate::store::{StoreResult, UserRepository};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, \
                            is_active, last_login_at, created_at, updated_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    builder.push(" WHERE TRUE");
    if let Some(role) = filter.role {
        builder.push(" AND role = ").push_bind(role);
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, data: CreateUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, LOWER($3), $4, $5, $6, $7)
            RETURNING id, username, email, password_hash, first_name, last_name, role,
                      is_active, last_login_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users \
             WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1) LIMIT 1",
            USER_COLUMNS
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list(&self, filter: &UserFilter, page: Page) -> StoreResult<(Vec<User>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let users = select.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    async fn update(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");
        if let Some(email) = data.email {
            builder.push(", email = LOWER(").push_bind(email).push(")");
        }
        if let Some(hash) = data.password_hash {
            builder.push(", password_hash = ").push_bind(hash);
        }
        if let Some(first_name) = data.first_name {
            builder.push(", first_name = ").push_bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            builder.push(", last_name = ").push_bind(last_name);
        }
        if let Some(role) = data.role {
            builder.push(", role = ").push_bind(role);
        }
        if let Some(is_active) = data.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {}", USER_COLUMNS));

        let user = builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_login(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>> {
        let summaries = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username, first_name, last_name
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }
}
