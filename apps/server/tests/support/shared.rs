use anyhow::Context as _;
use molstore::Config;
use std::sync::Arc;
use tokio::sync::OnceCell;

static SHARED: OnceCell<Arc<SharedTestResources>> = OnceCell::const_new();

pub struct SharedTestResources {
    pub base_config: Config,
    /// Admin connection string for per-test schemas; `None` skips database tests.
    pub database_url: Option<String>,
}

pub async fn shared() -> anyhow::Result<Arc<SharedTestResources>> {
    SHARED
        .get_or_try_init(|| async {
            init_tracing();

            let mut config = Config::load().context("load Config for tests")?;
            let database_url = std::env::var("MOLSTORE_TEST_DATABASE_URL")
                .ok()
                .or_else(|| config.database.test_database_url.clone());
            if let Some(url) = &database_url {
                config.database.url = url.clone();
            }

            config.database.run_migrations = true;
            config.database.pool_min_size = 0;
            config.database.pool_max_size = 5;
            config.database.pool_timeout_seconds = 30;

            Ok(Arc::new(SharedTestResources {
                base_config: config,
                database_url,
            }))
        })
        .await
        .cloned()
}

fn init_tracing() {
    use std::sync::OnceLock;
    use tracing_subscriber::prelude::*;
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "molstore=info,sqlx=warn".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}
