use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgQueryResult};

use crate::{
    error::{AppError, Result},
    models::QueuedJob,
    services::job_service::JobStore,
};

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Puts jobs left `running` by a previous process back in the queue.
    pub async fn requeue_interrupted(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', updated_at = NOW() WHERE status = 'running'",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct Backlog {
    pub pending: i64,
    pub failed: i64,
}

pub async fn backlog(pool: &PgPool) -> Result<Backlog> {
    let backlog = sqlx::query_as::<_, Backlog>(
        "SELECT COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed
         FROM jobs",
    )
    .fetch_one(pool)
    .await?;

    Ok(backlog)
}

fn found(id: i32, result: PgQueryResult) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Job {} not found", id)));
    }
    Ok(())
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn claim_next(&self) -> Result<Option<QueuedJob>> {
        let job = sqlx::query_as::<_, QueuedJob>(
            "UPDATE jobs SET status = 'running', attempts = attempts + 1, updated_at = NOW()
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE status = 'pending' AND run_at <= NOW()
                 ORDER BY run_at, id
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING *",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn complete(&self, id: i32) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET status = 'done', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        found(id, result)
    }

    async fn retry(&self, id: i32, run_at: DateTime<Utc>, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', run_at = $2, last_error = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(run_at)
        .bind(error)
        .execute(&self.pool)
        .await?;

        found(id, result)
    }

    async fn fail(&self, id: i32, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', last_error = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        found(id, result)
    }
}
