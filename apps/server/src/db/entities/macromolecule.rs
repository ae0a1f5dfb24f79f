use async_trait::async_trait;
use molstore_query::{Record, RelationshipDescriptor, SortDirection, SortSpec};
use std::sync::Arc;

use super::{entry_rows, EntityStore, EntryLookup, Stores, ENTRY};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::Result;

molstore_query::columns! {
    pub enum MacromoleculeColumn in "macromolecules" {
        Id => "id": Integer,
        PdbId => "pdb_id": Text,
        EntityId => "entity_id": Integer,
        Description => "description": Text,
        MacromoleculeType => "macromolecule_type": Text,
        MolecularWeight => "molecular_weight": Float,
        Copies => "copies": Integer,
        Mutation => "mutation": Text,
    }
}

#[derive(Clone)]
pub struct MacromoleculeStore {
    records: RecordStore<MacromoleculeColumn>,
}

impl EntityStore for MacromoleculeStore {
    type Column = MacromoleculeColumn;

    const PATH: &'static str = "macromolecules";
    const PRIMARY_KEY: MacromoleculeColumn = MacromoleculeColumn::Id;
    const DEFAULT_SORT: SortSpec<MacromoleculeColumn> = SortSpec {
        column: MacromoleculeColumn::Id,
        direction: SortDirection::Asc,
    };
    const SORTABLE: &'static [MacromoleculeColumn] = &[
        MacromoleculeColumn::Id,
        MacromoleculeColumn::PdbId,
        MacromoleculeColumn::EntityId,
        MacromoleculeColumn::MacromoleculeType,
        MacromoleculeColumn::MolecularWeight,
        MacromoleculeColumn::Copies,
    ];
    const TEXT_COLUMNS: &'static [MacromoleculeColumn] = &[
        MacromoleculeColumn::Description,
        MacromoleculeColumn::MacromoleculeType,
        MacromoleculeColumn::Mutation,
    ];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[ENTRY];

    fn records(&self) -> &RecordStore<MacromoleculeColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.macromolecules
    }
}

#[async_trait]
impl EntryLookup for MacromoleculeStore {
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        entry_rows(
            &self.records,
            MacromoleculeColumn::PdbId,
            pdb_id,
            SortSpec::asc(MacromoleculeColumn::EntityId),
        )
        .await
    }
}

impl MacromoleculeStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, MacromoleculeColumn::Id),
        }
    }

    pub async fn type_stats(&self) -> Result<Vec<Record>> {
        let sql = "SELECT jsonb_build_object('macromolecule_type', s.macromolecule_type, \
                          'count', s.count, 'total_copies', s.total_copies, \
                          'average_weight', s.average_weight) AS record \
                   FROM (SELECT macromolecule_type, COUNT(*) AS count, \
                                COALESCE(SUM(copies), 0) AS total_copies, \
                                AVG(molecular_weight) AS average_weight \
                         FROM macromolecules \
                         GROUP BY macromolecule_type) s \
                   ORDER BY s.count DESC, s.macromolecule_type NULLS LAST";
        self.records.fetch("type_stats", None, sql, &[]).await
    }
}
