#![allow(dead_code)]

pub mod shared;

use anyhow::Context as _;
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{Method, Request, StatusCode},
    Router,
};
use futures::FutureExt as _;
use molstore::{api::create_router, db::Executor, AppState, Config};
use molstore_query::{Record, Scalar};
use serde_json::Value as JsonValue;
use sqlx::Connection as _;
use std::sync::{Arc, Mutex};
use tower::ServiceExt as _;
use url::Url;
use uuid::Uuid;

type Responder = dyn Fn(&str, &[Scalar]) -> molstore::Result<Vec<Record>> + Send + Sync;

/// Executor that records statements and answers from a closure.
pub struct ScriptedExecutor {
    responder: Box<Responder>,
    calls: Mutex<Vec<(String, Vec<Scalar>)>>,
}

impl ScriptedExecutor {
    pub fn new(
        responder: impl Fn(&str, &[Scalar]) -> molstore::Result<Vec<Record>> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, Vec<Scalar>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, sql: &str, params: &[Scalar]) -> molstore::Result<Vec<Record>> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        (self.responder)(sql, params)
    }
}

pub fn record(value: JsonValue) -> Record {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    schema: Option<String>,
    admin_database_url: Option<String>,
}

impl TestApp {
    /// Router over an in-memory executor; no database involved.
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        let state = AppState::with_executor(Config::default(), executor);
        Self {
            router: create_router(state.clone()),
            state,
            schema: None,
            admin_database_url: None,
        }
    }

    /// Router over a fresh PostgreSQL schema, or `None` when no test database
    /// is configured (`MOLSTORE_TEST_DATABASE_URL`).
    pub async fn postgres() -> anyhow::Result<Option<Self>> {
        let shared = shared::shared().await?;
        let Some(admin_database_url) = shared.database_url.clone() else {
            eprintln!("MOLSTORE_TEST_DATABASE_URL not set, skipping database test");
            return Ok(None);
        };
        let mut config = shared.base_config.clone();

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let mut admin_conn = sqlx::PgConnection::connect(&admin_database_url)
            .await
            .context("connect admin db for schema create")?;
        sqlx::query(&format!(r#"CREATE SCHEMA "{}""#, schema))
            .execute(&mut admin_conn)
            .await
            .context("create test schema")?;

        config.database.url = with_search_path(&admin_database_url, &schema)?;
        // Per-test pools stay small so parallel tests do not exhaust connections.
        config.database.pool_max_size = 2;

        let state = AppState::new(config)
            .await
            .context("initialize AppState")?;
        let router = create_router(state.clone());

        Ok(Some(Self {
            router,
            state,
            schema: Some(schema),
            admin_database_url: Some(admin_database_url),
        }))
    }

    pub async fn cleanup(self) -> anyhow::Result<()> {
        if let Some(pool) = &self.state.db_pool {
            pool.close().await;
        }

        if let (Some(url), Some(schema)) = (&self.admin_database_url, &self.schema) {
            let mut admin_conn = sqlx::PgConnection::connect(url)
                .await
                .context("connect admin db for schema drop")?;
            sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, schema))
                .execute(&mut admin_conn)
                .await
                .context("drop test schema")?;
        }

        Ok(())
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<JsonValue>,
    ) -> anyhow::Result<(StatusCode, JsonValue)> {
        let request = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(serde_json::to_vec(&json)?),
                None => Body::empty(),
            })
            .context("build request")?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let bytes: Bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        Ok((status, json))
    }

    pub async fn get(&self, path_and_query: &str) -> anyhow::Result<(StatusCode, JsonValue)> {
        self.request(Method::GET, path_and_query, None).await
    }
}

/// Run `f` against a database-backed app, dropping its schema afterwards.
///
/// Does nothing when no test database is configured.
pub async fn with_postgres_app<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a TestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let Some(app) = TestApp::postgres().await? else {
        return Ok(());
    };

    let result = std::panic::AssertUnwindSafe(f(&app)).catch_unwind().await;
    if let Err(e) = app.cleanup().await {
        eprintln!("test schema cleanup failed: {e:?}");
    }

    match result {
        Ok(r) => r,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn with_search_path(database_url: &str, schema: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(database_url).context("parse database URL")?;
    url.query_pairs_mut()
        .append_pair("options", &format!("-c search_path={}", schema));
    Ok(url.to_string())
}
