//! Connection provider seam
//!
//! Everything above this module talks to the database through [`Executor`]:
//! one parameterized statement in, JSON-object rows out. Statements project
//! a single `record` column (`to_jsonb(t) AS record` or a
//! `jsonb_build_object(...)`), so rows decode without schema knowledge.

use async_trait::async_trait;
use molstore_query::{Record, Scalar};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::{Error, Result};

/// Executes one parameterized statement and returns its rows.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, sql: &str, params: &[Scalar]) -> Result<Vec<Record>>;
}

/// [`Executor`] over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn execute(&self, sql: &str, params: &[Scalar]) -> Result<Vec<Record>> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = match value {
                Scalar::Null => query.bind(None::<String>),
                Scalar::Bool(v) => query.bind(*v),
                Scalar::Int(v) => query.bind(*v),
                Scalar::Float(v) => query.bind(*v),
                Scalar::Text(v) => query.bind(v.clone()),
                Scalar::Date(v) => query.bind(*v),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| match row.try_get::<JsonValue, _>("record")? {
                JsonValue::Object(record) => Ok(record),
                other => Err(Error::Internal(format!(
                    "Expected a JSON object row, got {other}"
                ))),
            })
            .collect()
    }
}

/// Build the connection pool, applying `statement_timeout` to each connection.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let statement_timeout_ms = config.statement_timeout_seconds * 1000;

    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min_size)
        .max_connections(config.pool_max_size)
        .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                if statement_timeout_ms > 0 {
                    sqlx::query(&format!("SET statement_timeout = {statement_timeout_ms}"))
                        .execute(conn)
                        .await?;
                }
                Ok(())
            })
        })
        .connect(&config.url)
        .await?;

    tracing::info!(
        min_connections = config.pool_min_size,
        max_connections = config.pool_max_size,
        statement_timeout_seconds = config.statement_timeout_seconds,
        "Database pool ready"
    );

    Ok(pool)
}

/// Apply the embedded migrations in `apps/server/migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| Error::Internal(format!("Failed to run migrations: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
