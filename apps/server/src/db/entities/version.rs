use async_trait::async_trait;
use molstore_query::{Record, RelationshipDescriptor, Scalar, SortDirection, SortSpec};
use std::sync::Arc;

use super::{check_top_n, entry_rows, EntityStore, EntryLookup, Stores, ENTRY};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::Result;

molstore_query::columns! {
    pub enum VersionColumn in "version_history" {
        Id => "id": Integer,
        PdbId => "pdb_id": Text,
        RevisionNumber => "revision_number": Integer,
        RevisionDate => "revision_date": Date,
        RevisionType => "revision_type": Text,
        Description => "description": Text,
    }
}

/// Revision history of an entry.
#[derive(Clone)]
pub struct VersionStore {
    records: RecordStore<VersionColumn>,
}

impl EntityStore for VersionStore {
    type Column = VersionColumn;

    const PATH: &'static str = "versions";
    const PRIMARY_KEY: VersionColumn = VersionColumn::Id;
    const DEFAULT_SORT: SortSpec<VersionColumn> = SortSpec {
        column: VersionColumn::RevisionDate,
        direction: SortDirection::Desc,
    };
    const SORTABLE: &'static [VersionColumn] = &[
        VersionColumn::Id,
        VersionColumn::PdbId,
        VersionColumn::RevisionNumber,
        VersionColumn::RevisionDate,
        VersionColumn::RevisionType,
    ];
    const TEXT_COLUMNS: &'static [VersionColumn] =
        &[VersionColumn::RevisionType, VersionColumn::Description];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[ENTRY];

    fn records(&self) -> &RecordStore<VersionColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.versions
    }
}

#[async_trait]
impl EntryLookup for VersionStore {
    /// Oldest revision first.
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        entry_rows(
            &self.records,
            VersionColumn::PdbId,
            pdb_id,
            SortSpec::asc(VersionColumn::RevisionNumber),
        )
        .await
    }
}

impl VersionStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, VersionColumn::Id),
        }
    }

    /// Latest revision of each entry, most recently revised entries first.
    pub async fn latest_revisions(&self, limit: u32) -> Result<Vec<Record>> {
        let limit = check_top_n(limit)?;
        let sql = "SELECT to_jsonb(s) - 'rn' AS record \
                   FROM (SELECT v.*, \
                                ROW_NUMBER() OVER (PARTITION BY v.pdb_id \
                                                   ORDER BY v.revision_number DESC) AS rn \
                         FROM version_history v) s \
                   WHERE s.rn = 1 \
                   ORDER BY s.revision_date DESC NULLS LAST, s.pdb_id \
                   LIMIT $1";
        self.records
            .fetch("latest_revisions", None, sql, &[Scalar::from(limit)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{record, MemoryExecutor};
    use serde_json::json;

    #[tokio::test]
    async fn latest_revisions_keeps_one_row_per_entry() {
        let executor = Arc::new(MemoryExecutor::new(|_, _| {
            Ok(vec![
                record(json!({"pdb_id": "1ABC", "revision_number": 3})),
                record(json!({"pdb_id": "2XYZ", "revision_number": 1})),
            ])
        }));
        let store = VersionStore::new(executor.clone());

        let rows = store.latest_revisions(2).await.unwrap();

        assert_eq!(rows.len(), 2);
        let (sql, params) = &executor.calls()[0];
        assert!(sql.contains("PARTITION BY v.pdb_id"));
        assert!(sql.contains("WHERE s.rn = 1"));
        assert_eq!(params, &vec![Scalar::Int(2)]);
    }
}
