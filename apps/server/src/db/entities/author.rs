use async_trait::async_trait;
use molstore_query::{Record, RelationshipDescriptor, Scalar, SortDirection, SortSpec};
use std::sync::Arc;

use super::{check_top_n, entry_rows, EntityStore, EntryLookup, Stores, ENTRY};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::Result;

molstore_query::columns! {
    pub enum AuthorColumn in "authors" {
        Id => "id": Integer,
        PdbId => "pdb_id": Text,
        Name => "name": Text,
        Ordinal => "ordinal": Integer,
    }
}

/// Structure authors, in deposition order per entry.
#[derive(Clone)]
pub struct AuthorStore {
    records: RecordStore<AuthorColumn>,
}

impl EntityStore for AuthorStore {
    type Column = AuthorColumn;

    const PATH: &'static str = "authors";
    const PRIMARY_KEY: AuthorColumn = AuthorColumn::Id;
    const DEFAULT_SORT: SortSpec<AuthorColumn> = SortSpec {
        column: AuthorColumn::Name,
        direction: SortDirection::Asc,
    };
    const SORTABLE: &'static [AuthorColumn] = &[
        AuthorColumn::Id,
        AuthorColumn::PdbId,
        AuthorColumn::Name,
        AuthorColumn::Ordinal,
    ];
    const TEXT_COLUMNS: &'static [AuthorColumn] = &[AuthorColumn::Name];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[ENTRY];

    fn records(&self) -> &RecordStore<AuthorColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.authors
    }
}

#[async_trait]
impl EntryLookup for AuthorStore {
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        entry_rows(
            &self.records,
            AuthorColumn::PdbId,
            pdb_id,
            SortSpec::asc(AuthorColumn::Ordinal),
        )
        .await
    }
}

impl AuthorStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, AuthorColumn::Id),
        }
    }

    /// Authors on the most entries.
    pub async fn top_authors(&self, top_n: u32) -> Result<Vec<Record>> {
        let top_n = check_top_n(top_n)?;
        let sql = "SELECT jsonb_build_object('name', s.name, 'entry_count', s.entry_count) AS record \
                   FROM (SELECT name, COUNT(DISTINCT pdb_id) AS entry_count \
                         FROM authors \
                         GROUP BY name \
                         ORDER BY entry_count DESC, name \
                         LIMIT $1) s \
                   ORDER BY s.entry_count DESC, s.name";
        self.records
            .fetch("top_authors", None, sql, &[Scalar::from(top_n)])
            .await
    }
}
