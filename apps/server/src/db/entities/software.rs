use async_trait::async_trait;
use molstore_query::{Record, RelationshipDescriptor, Scalar, SortDirection, SortSpec};
use std::sync::Arc;

use super::{check_top_n, entry_rows, EntityStore, EntryLookup, Stores, ENTRY};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::Result;

molstore_query::columns! {
    pub enum SoftwareColumn in "software_used" {
        Id => "id": Integer,
        PdbId => "pdb_id": Text,
        Name => "name": Text,
        Version => "version": Text,
        Classification => "classification": Text,
    }
}

/// Software packages used to determine an entry.
#[derive(Clone)]
pub struct SoftwareStore {
    records: RecordStore<SoftwareColumn>,
}

impl EntityStore for SoftwareStore {
    type Column = SoftwareColumn;

    const PATH: &'static str = "software";
    const PRIMARY_KEY: SoftwareColumn = SoftwareColumn::Id;
    const DEFAULT_SORT: SortSpec<SoftwareColumn> = SortSpec {
        column: SoftwareColumn::Name,
        direction: SortDirection::Asc,
    };
    const SORTABLE: &'static [SoftwareColumn] = &[
        SoftwareColumn::Id,
        SoftwareColumn::PdbId,
        SoftwareColumn::Name,
        SoftwareColumn::Classification,
    ];
    const TEXT_COLUMNS: &'static [SoftwareColumn] =
        &[SoftwareColumn::Name, SoftwareColumn::Classification];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[ENTRY];

    fn records(&self) -> &RecordStore<SoftwareColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.software
    }
}

#[async_trait]
impl EntryLookup for SoftwareStore {
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        entry_rows(
            &self.records,
            SoftwareColumn::PdbId,
            pdb_id,
            SortSpec::asc(SoftwareColumn::Classification),
        )
        .await
    }
}

impl SoftwareStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, SoftwareColumn::Id),
        }
    }

    /// The `top_n` most used packages within each classification.
    pub async fn usage_stats(&self, top_n: u32) -> Result<Vec<Record>> {
        let top_n = check_top_n(top_n)?;
        let sql = "SELECT jsonb_build_object('classification', s.classification, 'name', s.name, \
                          'entry_count', s.entry_count, 'rank', s.rank) AS record \
                   FROM (SELECT classification, name, COUNT(DISTINCT pdb_id) AS entry_count, \
                                ROW_NUMBER() OVER (PARTITION BY classification \
                                                   ORDER BY COUNT(DISTINCT pdb_id) DESC, name) AS rank \
                         FROM software_used \
                         GROUP BY classification, name) s \
                   WHERE s.rank <= $1 \
                   ORDER BY s.classification NULLS LAST, s.rank";
        self.records
            .fetch("usage_stats", None, sql, &[Scalar::from(top_n)])
            .await
    }
}
