use async_trait::async_trait;
use molstore_query::{Record, RelationshipDescriptor, Scalar, SortDirection, SortSpec};
use std::sync::Arc;

use super::{entry_rows, EntityStore, EntryLookup, Stores, ENTRY};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::{Error, Result};

/// Narrowest histogram bucket, in Å.
pub const MIN_BUCKET_WIDTH: f64 = 0.01;

molstore_query::columns! {
    pub enum ExperimentColumn in "experimental_data" {
        Id => "id": Integer,
        PdbId => "pdb_id": Text,
        Method => "method": Text,
        Resolution => "resolution": Float,
        RWork => "r_work": Float,
        RFree => "r_free": Float,
        Temperature => "temperature": Float,
        Ph => "ph": Float,
        SpaceGroup => "space_group": Text,
    }
}

/// Experimental method and refinement statistics of an entry.
#[derive(Clone)]
pub struct ExperimentStore {
    records: RecordStore<ExperimentColumn>,
}

impl EntityStore for ExperimentStore {
    type Column = ExperimentColumn;

    const PATH: &'static str = "experiments";
    const PRIMARY_KEY: ExperimentColumn = ExperimentColumn::Id;
    const DEFAULT_SORT: SortSpec<ExperimentColumn> = SortSpec {
        column: ExperimentColumn::Resolution,
        direction: SortDirection::Asc,
    };
    const SORTABLE: &'static [ExperimentColumn] = &[
        ExperimentColumn::Id,
        ExperimentColumn::PdbId,
        ExperimentColumn::Method,
        ExperimentColumn::Resolution,
        ExperimentColumn::RWork,
        ExperimentColumn::RFree,
        ExperimentColumn::Temperature,
        ExperimentColumn::Ph,
    ];
    const TEXT_COLUMNS: &'static [ExperimentColumn] = &[
        ExperimentColumn::PdbId,
        ExperimentColumn::Method,
        ExperimentColumn::SpaceGroup,
    ];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[ENTRY];

    fn records(&self) -> &RecordStore<ExperimentColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.experiments
    }
}

#[async_trait]
impl EntryLookup for ExperimentStore {
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        entry_rows(
            &self.records,
            ExperimentColumn::PdbId,
            pdb_id,
            Self::DEFAULT_SORT,
        )
        .await
    }
}

impl ExperimentStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, ExperimentColumn::Id),
        }
    }

    /// Entry count and resolution summary per experimental method.
    pub async fn method_stats(&self) -> Result<Vec<Record>> {
        let sql = "SELECT jsonb_build_object('method', s.method, 'count', s.count, \
                          'average_resolution', s.average_resolution, \
                          'best_resolution', s.best_resolution) AS record \
                   FROM (SELECT method, COUNT(*) AS count, \
                                AVG(resolution) AS average_resolution, \
                                MIN(resolution) AS best_resolution \
                         FROM experimental_data \
                         GROUP BY method) s \
                   ORDER BY s.count DESC, s.method";
        self.records.fetch("method_stats", None, sql, &[]).await
    }

    /// Resolution histogram with buckets `[k * width, (k + 1) * width)`.
    ///
    /// Empty buckets are not returned.
    pub async fn resolution_histogram(&self, bucket_width: f64) -> Result<Vec<Record>> {
        if !bucket_width.is_finite() || bucket_width < MIN_BUCKET_WIDTH {
            return Err(Error::Validation(format!(
                "bucket_width must be at least {MIN_BUCKET_WIDTH}, got {bucket_width}"
            )));
        }

        let sql = "SELECT jsonb_build_object('bucket_start', s.bucket * $1::float8, \
                          'bucket_end', (s.bucket + 1) * $1::float8, \
                          'count', s.count) AS record \
                   FROM (SELECT FLOOR(resolution / $1::float8)::bigint AS bucket, COUNT(*) AS count \
                         FROM experimental_data \
                         WHERE resolution IS NOT NULL \
                         GROUP BY 1) s \
                   ORDER BY s.bucket";
        self.records
            .fetch(
                "resolution_histogram",
                None,
                sql,
                &[Scalar::Float(bucket_width)],
            )
            .await
    }
}
