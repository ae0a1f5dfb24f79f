//! In-memory [`Executor`] for unit tests

use async_trait::async_trait;
use molstore_query::{Record, Scalar};
use serde_json::Value as JsonValue;
use std::sync::Mutex;

use super::executor::Executor;
use crate::Result;

type Responder = dyn Fn(&str, &[Scalar]) -> Result<Vec<Record>> + Send + Sync;

/// Records every statement it receives and answers with `responder`.
pub struct MemoryExecutor {
    responder: Box<Responder>,
    calls: Mutex<Vec<(String, Vec<Scalar>)>>,
}

impl MemoryExecutor {
    pub fn new(
        responder: impl Fn(&str, &[Scalar]) -> Result<Vec<Record>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every statement with no rows.
    pub fn empty() -> Self {
        Self::new(|_, _| Ok(Vec::new()))
    }

    pub fn calls(&self) -> Vec<(String, Vec<Scalar>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Executor for MemoryExecutor {
    async fn execute(&self, sql: &str, params: &[Scalar]) -> Result<Vec<Record>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((sql.to_string(), params.to_vec()));
        }
        (self.responder)(sql, params)
    }
}

pub fn record(value: JsonValue) -> Record {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
