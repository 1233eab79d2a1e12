use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{ConsumeOutcome, RefreshTokenRecord, RefreshTokenRepository, StoreResult};

pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn insert(&self, record: RefreshTokenRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (jti, user_id, expires_at, revoked_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.jti)
        .bind(record.user_id)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume(&self, jti: Uuid) -> StoreResult<ConsumeOutcome> {
        let consumed: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE jti = $1 AND revoked_at IS NULL AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(user_id) = consumed {
            return Ok(ConsumeOutcome::Consumed { user_id });
        }

        let existing = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT jti, user_id, expires_at, revoked_at, created_at \
             FROM refresh_tokens WHERE jti = $1",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match existing {
            Some(record) if record.revoked_at.is_some() => ConsumeOutcome::Reused {
                user_id: record.user_id,
            },
            _ => ConsumeOutcome::Rejected,
        })
    }

    async fn revoke(&self, jti: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE jti = $1 AND revoked_at IS NULL",
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() \
             WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
