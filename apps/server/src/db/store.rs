//! Generic record store
//!
//! One implementation of read / search / create / update / delete shared by
//! every entity table. All statements go through [`RecordStore::fetch`], which
//! records metrics and wraps executor failures in [`Error::Query`] with the
//! table, operation and id attached.

use molstore_query::{
    Binds, Column, FieldSet, Record, RecordEnvelope, RelationshipDescriptor, Scalar,
    SearchPredicate, SearchRequest, SortSpec,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;

use super::executor::Executor;
use super::relationships::resolve_relationships;
use crate::{Error, Result};

/// Record store for the table whose allow-listed columns are `C`.
pub struct RecordStore<C: Column> {
    executor: Arc<dyn Executor>,
    primary_key: C,
}

impl<C: Column> Clone for RecordStore<C> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            primary_key: self.primary_key,
        }
    }
}

impl<C: Column> RecordStore<C> {
    pub fn new(executor: Arc<dyn Executor>, primary_key: C) -> Self {
        Self {
            executor,
            primary_key,
        }
    }

    pub fn table(&self) -> &'static str {
        C::TABLE
    }

    pub fn primary_key(&self) -> C {
        self.primary_key
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Row with the given primary key, or `None`.
    #[tracing::instrument(skip(self), fields(table = C::TABLE))]
    pub async fn read_one(&self, id: &Scalar) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT to_jsonb(t) AS record FROM {} t WHERE t.{} = $1",
            C::TABLE,
            self.primary_key.name()
        );
        let rows = self
            .fetch("read", Some(id), &sql, std::slice::from_ref(id))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// [`read_one`](Self::read_one) enriched with `relationships`.
    ///
    /// Relationship failures degrade to empty values; only the root lookup
    /// can fail the call.
    pub async fn read_with_relationships(
        &self,
        id: &Scalar,
        relationships: &[RelationshipDescriptor],
    ) -> Result<Option<Record>> {
        match self.read_one(id).await? {
            Some(record) => Ok(Some(
                resolve_relationships(self.executor(), &record, relationships).await,
            )),
            None => Ok(None),
        }
    }

    /// Filtered, sorted page plus the total number of matching rows.
    ///
    /// The count and the page are two statements issued concurrently with the
    /// same WHERE clause and parameters; LIMIT/OFFSET bind after them. They
    /// do not share a snapshot, so under concurrent writes `total` can differ
    /// slightly from what the page reflects.
    #[tracing::instrument(skip_all, fields(table = C::TABLE))]
    pub async fn search(&self, request: &SearchRequest<C>) -> Result<RecordEnvelope<Record>> {
        let mut binds = Binds::new();
        let where_clause = request.where_clause(&mut binds);
        let count_params = binds.values().to_vec();

        let count_sql = format!(
            "SELECT jsonb_build_object('total', COUNT(*)) AS record FROM {} t{where_clause}",
            C::TABLE
        );

        let pagination = request.pagination;
        let limit = binds.push(i64::from(pagination.limit()));
        let offset = binds.push(i64::try_from(pagination.offset_rows()).unwrap_or(i64::MAX));
        let data_sql = format!(
            "SELECT to_jsonb(t) AS record FROM {} t{where_clause}{} LIMIT ${limit} OFFSET ${offset}",
            C::TABLE,
            request.sort.order_by_sql(self.primary_key)
        );

        let (count_rows, data) = futures::try_join!(
            self.fetch("count", None, &count_sql, &count_params),
            self.fetch("search", None, &data_sql, binds.values()),
        )?;

        let total = count_rows
            .first()
            .and_then(|row| row.get("total"))
            .and_then(JsonValue::as_i64)
            .unwrap_or(0);

        crate::metrics::SEARCH_RESULTS
            .with_label_values(&[C::TABLE])
            .observe(data.len() as f64);

        tracing::debug!(total, returned = data.len(), "Search completed");

        Ok(RecordEnvelope::new(data, pagination.info(total)))
    }

    /// Unpaged rows matching `predicate`, capped at `limit` when given.
    ///
    /// Used for bounded child collections such as the chains of one entry.
    pub async fn find(
        &self,
        predicate: Option<&SearchPredicate<C>>,
        sort: SortSpec<C>,
        limit: Option<u32>,
    ) -> Result<Vec<Record>> {
        let mut binds = Binds::new();
        let filter = binds.push_predicate(predicate);
        let mut sql = format!("SELECT to_jsonb(t) AS record FROM {} t", C::TABLE);
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        sql.push_str(&sort.order_by_sql(self.primary_key));
        if let Some(limit) = limit {
            let idx = binds.push(i64::from(limit));
            sql.push_str(&format!(" LIMIT ${idx}"));
        }

        self.fetch("find", None, &sql, binds.values()).await
    }

    /// Insert a row and return it as stored, defaults included.
    #[tracing::instrument(skip_all, fields(table = C::TABLE))]
    pub async fn create(&self, fields: &FieldSet<C>) -> Result<Record> {
        if fields.is_empty() {
            return Err(Error::Validation(format!(
                "Cannot create a {} record without fields",
                C::TABLE
            )));
        }

        let mut binds = Binds::new();
        let columns: Vec<&str> = fields.keys().map(|c| c.name()).collect();
        let values: Vec<String> = fields
            .values()
            .map(|value| value_sql(value, &mut binds))
            .collect();

        let sql = format!(
            "INSERT INTO {} AS t ({}) VALUES ({}) RETURNING to_jsonb(t) AS record",
            C::TABLE,
            columns.join(", "),
            values.join(", ")
        );

        let record = self
            .fetch("create", None, &sql, binds.values())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Internal(format!("INSERT into {} returned no row", C::TABLE)))?;

        tracing::info!("Record created");
        Ok(record)
    }

    /// Set only the given columns. `None` when no row has this id.
    #[tracing::instrument(skip(self, fields), fields(table = C::TABLE))]
    pub async fn update(&self, id: &Scalar, fields: &FieldSet<C>) -> Result<Option<Record>> {
        if fields.is_empty() {
            return Err(Error::Validation(format!(
                "Cannot update a {} record without fields",
                C::TABLE
            )));
        }

        let mut binds = Binds::new();
        let assignments: Vec<String> = fields
            .iter()
            .map(|(column, value)| format!("{} = {}", column.name(), value_sql(value, &mut binds)))
            .collect();
        let id_idx = binds.push(id.clone());

        let sql = format!(
            "UPDATE {} AS t SET {} WHERE t.{} = ${id_idx} RETURNING to_jsonb(t) AS record",
            C::TABLE,
            assignments.join(", "),
            self.primary_key.name()
        );

        let rows = self.fetch("update", Some(id), &sql, binds.values()).await?;
        Ok(rows.into_iter().next())
    }

    /// Remove a row, returning its prior contents. `None` when nothing matched.
    #[tracing::instrument(skip(self), fields(table = C::TABLE))]
    pub async fn delete(&self, id: &Scalar) -> Result<Option<Record>> {
        let sql = format!(
            "DELETE FROM {} AS t WHERE t.{} = $1 RETURNING to_jsonb(t) AS record",
            C::TABLE,
            self.primary_key.name()
        );
        let rows = self
            .fetch("delete", Some(id), &sql, std::slice::from_ref(id))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Run one statement for this table.
    ///
    /// Hand-written entity queries go through here too so they get the same
    /// error context and metrics as the generic operations.
    pub async fn fetch(
        &self,
        operation: &'static str,
        target: Option<&Scalar>,
        sql: &str,
        params: &[Scalar],
    ) -> Result<Vec<Record>> {
        let start = Instant::now();
        let result = self.executor.execute(sql, params).await;

        crate::metrics::DB_QUERY_DURATION_SECONDS
            .with_label_values(&[C::TABLE, operation])
            .observe(start.elapsed().as_secs_f64());

        result.map_err(|err| {
            crate::metrics::DB_QUERY_ERRORS_TOTAL
                .with_label_values(&[C::TABLE, operation])
                .inc();
            tracing::error!(
                table = C::TABLE,
                operation,
                target = target.map(tracing::field::display),
                error = %err,
                "Statement failed"
            );
            Error::Query {
                operation,
                table: C::TABLE,
                target: target.map(ToString::to_string),
                message: err.to_string(),
            }
        })
    }
}

/// `NULL` is written literally so it takes the column's type.
fn value_sql(value: &Scalar, binds: &mut Binds) -> String {
    if value.is_null() {
        "NULL".to_string()
    } else {
        binds.placeholder(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{record, MemoryExecutor};
    use molstore_query::{Operator, PageRequest, Pagination, TextSearch};
    use serde_json::json;

    molstore_query::columns! {
        enum Sample in "samples" {
            Id => "id": Integer,
            Name => "name": Text,
            Status => "status": Text,
            Age => "age": Integer,
        }
    }

    fn store(executor: &Arc<MemoryExecutor>) -> RecordStore<Sample> {
        RecordStore::new(executor.clone(), Sample::Id)
    }

    /// 25 rows named `sample-00`..`sample-24`; pages are sliced from the
    /// bound LIMIT/OFFSET so ordering by name ascending is the fixture order.
    fn twenty_five_rows() -> Arc<MemoryExecutor> {
        let rows: Vec<Record> = (0..25)
            .map(|i| record(json!({"id": i + 1, "name": format!("sample-{i:02}")})))
            .collect();

        Arc::new(MemoryExecutor::new(move |sql, params| {
            if sql.contains("COUNT(*)") {
                return Ok(vec![record(json!({"total": rows.len()}))]);
            }
            let int = |i: usize| match params.get(i) {
                Some(Scalar::Int(v)) => *v as usize,
                _ => 0,
            };
            let (limit, offset) = (int(params.len() - 2), int(params.len() - 1));
            Ok(rows.iter().skip(offset).take(limit).cloned().collect())
        }))
    }

    #[tokio::test]
    async fn search_pages_and_counts() {
        let executor = twenty_five_rows();
        let request = SearchRequest::new(Pagination::page(2, 10), SortSpec::asc(Sample::Name));

        let envelope = store(&executor).search(&request).await.unwrap();

        assert_eq!(envelope.data.len(), 10);
        assert_eq!(envelope.pagination.total, 25);
        assert_eq!(envelope.pagination.total_pages, 3);
        assert_eq!(envelope.pagination.page, 2);
        let names: Vec<&str> = envelope
            .data
            .iter()
            .filter_map(|r| r.get("name").and_then(JsonValue::as_str))
            .collect();
        assert_eq!(names.first(), Some(&"sample-10"));
        assert_eq!(names.last(), Some(&"sample-19"));

        let calls = executor.calls();
        let (count_sql, count_params) = calls
            .iter()
            .find(|(sql, _)| sql.contains("COUNT(*)"))
            .unwrap();
        assert_eq!(
            count_sql,
            "SELECT jsonb_build_object('total', COUNT(*)) AS record FROM samples t"
        );
        assert!(count_params.is_empty());

        let (data_sql, data_params) = calls
            .iter()
            .find(|(sql, _)| sql.contains("LIMIT"))
            .unwrap();
        assert_eq!(
            data_sql,
            "SELECT to_jsonb(t) AS record FROM samples t \
             ORDER BY name ASC NULLS LAST, id ASC LIMIT $1 OFFSET $2"
        );
        assert_eq!(data_params, &vec![Scalar::Int(10), Scalar::Int(10)]);
    }

    #[tokio::test]
    async fn last_page_is_partial_and_past_the_end_is_empty() {
        let executor = twenty_five_rows();
        let sort = SortSpec::asc(Sample::Name);

        let last = store(&executor)
            .search(&SearchRequest::new(Pagination::page(3, 10), sort))
            .await
            .unwrap();
        assert_eq!(last.data.len(), 5);

        let beyond = store(&executor)
            .search(&SearchRequest::new(Pagination::offset(10, 40), sort))
            .await
            .unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.pagination.total, 25);
    }

    #[tokio::test]
    async fn limit_and_offset_bind_after_filter_params() {
        let executor = Arc::new(MemoryExecutor::new(|sql, _| {
            if sql.contains("COUNT(*)") {
                Ok(vec![record(json!({"total": 0}))])
            } else {
                Ok(Vec::new())
            }
        }));
        let predicate = SearchPredicate::and([
            SearchPredicate::eq(Sample::Status, "active").unwrap(),
            SearchPredicate::compare(Sample::Age, Operator::Gte, 18).unwrap(),
        ]);
        let request = SearchRequest::new(
            PageRequest::default().resolve(20, 100),
            SortSpec::desc(Sample::Age),
        )
        .with_predicate(predicate)
        .with_text(TextSearch::new("ann", &[Sample::Name]));

        store(&executor).search(&request).await.unwrap();

        let calls = executor.calls();
        let (data_sql, params) = calls.iter().find(|(sql, _)| sql.contains("LIMIT")).unwrap();
        assert_eq!(
            data_sql,
            "SELECT to_jsonb(t) AS record FROM samples t \
             WHERE (status = $1 AND age >= $2) AND (name ILIKE $3) \
             ORDER BY age DESC NULLS LAST, id DESC LIMIT $4 OFFSET $5"
        );
        assert_eq!(
            params,
            &vec![
                Scalar::from("active"),
                Scalar::Int(18),
                Scalar::from("%ann%"),
                Scalar::Int(20),
                Scalar::Int(0),
            ]
        );

        let (count_sql, count_params) =
            calls.iter().find(|(sql, _)| sql.contains("COUNT(*)")).unwrap();
        assert!(count_sql.ends_with("WHERE (status = $1 AND age >= $2) AND (name ILIKE $3)"));
        assert_eq!(count_params.len(), 3);
    }

    #[tokio::test]
    async fn create_with_no_fields_never_reaches_the_database() {
        let executor = Arc::new(MemoryExecutor::empty());

        let err = store(&executor).create(&FieldSet::new()).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn create_returns_stored_row() {
        let executor = Arc::new(MemoryExecutor::new(|_, _| {
            Ok(vec![record(json!({"id": 7, "name": "Ada", "status": null, "age": null}))])
        }));
        let mut fields = FieldSet::new();
        fields.insert(Sample::Name, Scalar::from("Ada"));
        fields.insert(Sample::Status, Scalar::Null);

        let created = store(&executor).create(&fields).await.unwrap();

        assert_eq!(created.get("id"), Some(&json!(7)));
        let calls = executor.calls();
        assert_eq!(
            calls[0].0,
            "INSERT INTO samples AS t (name, status) VALUES ($1, NULL) RETURNING to_jsonb(t) AS record"
        );
        assert_eq!(calls[0].1, vec![Scalar::from("Ada")]);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_row_return_none() {
        let executor = Arc::new(MemoryExecutor::empty());
        let store = store(&executor);
        let mut fields = FieldSet::new();
        fields.insert(Sample::Age, Scalar::Int(1));

        assert_eq!(store.update(&Scalar::Int(404), &fields).await.unwrap(), None);
        assert_eq!(store.delete(&Scalar::Int(404)).await.unwrap(), None);
        assert_eq!(store.read_one(&Scalar::Int(404)).await.unwrap(), None);

        let calls = executor.calls();
        assert_eq!(
            calls[0].0,
            "UPDATE samples AS t SET age = $1 WHERE t.id = $2 RETURNING to_jsonb(t) AS record"
        );
        assert_eq!(calls[0].1, vec![Scalar::Int(1), Scalar::Int(404)]);
        assert_eq!(
            calls[1].0,
            "DELETE FROM samples AS t WHERE t.id = $1 RETURNING to_jsonb(t) AS record"
        );
    }

    #[tokio::test]
    async fn update_with_no_fields_is_rejected() {
        let executor = Arc::new(MemoryExecutor::empty());
        let err = store(&executor)
            .update(&Scalar::Int(1), &FieldSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn executor_failures_are_wrapped_with_context() {
        let executor = Arc::new(MemoryExecutor::new(|_, _| {
            Err(Error::Internal("connection reset".to_string()))
        }));

        let err = store(&executor).read_one(&Scalar::Int(7)).await.unwrap_err();

        match err {
            Error::Query {
                operation,
                table,
                target,
                message,
            } => {
                assert_eq!(operation, "read");
                assert_eq!(table, "samples");
                assert_eq!(target.as_deref(), Some("7"));
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected Query error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_one_is_stable_without_writes() {
        let executor = Arc::new(MemoryExecutor::new(|_, _| {
            Ok(vec![record(json!({"id": 3, "name": "Bob"}))])
        }));
        let store = store(&executor);

        let first = store.read_one(&Scalar::Int(3)).await.unwrap();
        let second = store.read_one(&Scalar::Int(3)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn find_applies_filter_order_and_limit() {
        let executor = Arc::new(MemoryExecutor::empty());
        let predicate = SearchPredicate::eq(Sample::Status, "archived").unwrap();

        store(&executor)
            .find(Some(&predicate), SortSpec::asc(Sample::Name), Some(5))
            .await
            .unwrap();

        let calls = executor.calls();
        assert_eq!(
            calls[0].0,
            "SELECT to_jsonb(t) AS record FROM samples t WHERE status = $1 \
             ORDER BY name ASC NULLS LAST, id ASC LIMIT $2"
        );
        assert_eq!(calls[0].1, vec![Scalar::from("archived"), Scalar::Int(5)]);
    }
}
