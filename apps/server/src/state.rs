//! Shared application state

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{create_pool, run_migrations, Executor, PgExecutor, Stores};
use crate::Result;

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when the stores run over an injected executor.
    pub db_pool: Option<PgPool>,
    pub stores: Arc<Stores>,
}

impl AppState {
    /// Connect to PostgreSQL, apply migrations if enabled, and build the stores.
    pub async fn new(config: Config) -> Result<Self> {
        let pool = create_pool(&config.database).await?;
        if config.database.run_migrations {
            run_migrations(&pool).await?;
        }

        let executor: Arc<dyn Executor> = Arc::new(PgExecutor::new(pool.clone()));
        Ok(Self {
            config: Arc::new(config),
            db_pool: Some(pool),
            stores: Arc::new(Stores::new(executor)),
        })
    }

    /// Build the stores over an arbitrary executor.
    pub fn with_executor(config: Config, executor: Arc<dyn Executor>) -> Self {
        Self {
            config: Arc::new(config),
            db_pool: None,
            stores: Arc::new(Stores::new(executor)),
        }
    }
}
