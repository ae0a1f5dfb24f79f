use async_trait::async_trait;
use molstore_query::{
    Pagination, Record, RecordEnvelope, RelationshipDescriptor, SearchPredicate, SortDirection,
    SortSpec,
};
use std::sync::Arc;

use super::{entry_rows, EntityStore, EntryLookup, Stores, ENTRY};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::{Error, Result};

molstore_query::columns! {
    pub enum ChainColumn in "chains" {
        Id => "id": Integer,
        PdbId => "pdb_id": Text,
        ChainId => "chain_id": Text,
        EntityId => "entity_id": Integer,
        MoleculeType => "molecule_type": Text,
        Sequence => "sequence": Text,
        SequenceLength => "sequence_length": Integer,
        OrganismId => "organism_id": Integer,
    }
}

/// Polymer chains of an entry.
#[derive(Clone)]
pub struct ChainStore {
    records: RecordStore<ChainColumn>,
}

impl EntityStore for ChainStore {
    type Column = ChainColumn;

    const PATH: &'static str = "chains";
    const PRIMARY_KEY: ChainColumn = ChainColumn::Id;
    const DEFAULT_SORT: SortSpec<ChainColumn> = SortSpec {
        column: ChainColumn::Id,
        direction: SortDirection::Asc,
    };
    const SORTABLE: &'static [ChainColumn] = &[
        ChainColumn::Id,
        ChainColumn::PdbId,
        ChainColumn::ChainId,
        ChainColumn::MoleculeType,
        ChainColumn::SequenceLength,
    ];
    const TEXT_COLUMNS: &'static [ChainColumn] = &[
        ChainColumn::PdbId,
        ChainColumn::ChainId,
        ChainColumn::MoleculeType,
    ];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[
        ENTRY,
        RelationshipDescriptor::belongs_to("organism", "organisms", "id", "organism_id"),
    ];

    fn records(&self) -> &RecordStore<ChainColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.chains
    }
}

#[async_trait]
impl EntryLookup for ChainStore {
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        entry_rows(
            &self.records,
            ChainColumn::PdbId,
            pdb_id,
            SortSpec::asc(ChainColumn::ChainId),
        )
        .await
    }
}

impl ChainStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, ChainColumn::Id),
        }
    }

    /// Sequence length distribution per molecule type.
    pub async fn length_stats(&self) -> Result<Vec<Record>> {
        let sql = "SELECT jsonb_build_object('molecule_type', s.molecule_type, 'count', s.count, \
                          'min_length', s.min_length, 'max_length', s.max_length, \
                          'average_length', s.average_length) AS record \
                   FROM (SELECT molecule_type, COUNT(*) AS count, \
                                MIN(sequence_length) AS min_length, \
                                MAX(sequence_length) AS max_length, \
                                AVG(sequence_length)::float8 AS average_length \
                         FROM chains \
                         WHERE sequence_length IS NOT NULL \
                         GROUP BY molecule_type) s \
                   ORDER BY s.count DESC, s.molecule_type NULLS LAST";
        self.records.fetch("length_stats", None, sql, &[]).await
    }

    /// Chains whose one-letter sequence contains `motif`.
    ///
    /// The motif is upper-cased; anything but residue letters is rejected.
    pub async fn by_sequence_motif(
        &self,
        motif: &str,
        pagination: Pagination,
    ) -> Result<RecordEnvelope<Record>> {
        let motif = motif.trim().to_ascii_uppercase();
        if motif.is_empty() || !motif.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::Validation(format!(
                "Sequence motif must be residue letters, got '{motif}'"
            )));
        }

        let predicate = SearchPredicate::contains(ChainColumn::Sequence, &motif)?;
        let request = Self::request(pagination).with_predicate(predicate);
        self.records.search(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::MemoryExecutor;
    use molstore_query::Scalar;

    #[tokio::test]
    async fn entry_chains_are_ordered_by_chain_id() {
        let executor = Arc::new(MemoryExecutor::empty());
        let store = ChainStore::new(executor.clone());

        store.by_pdb_id("1abc").await.unwrap();

        let calls = executor.calls();
        assert_eq!(
            calls[0].0,
            "SELECT to_jsonb(t) AS record FROM chains t WHERE pdb_id = $1 \
             ORDER BY chain_id ASC NULLS LAST, id ASC"
        );
        assert_eq!(calls[0].1, vec![Scalar::from("1ABC")]);
    }

    #[tokio::test]
    async fn motif_must_be_residue_letters() {
        let executor = Arc::new(MemoryExecutor::empty());
        let store = ChainStore::new(executor.clone());

        let err = store
            .by_sequence_motif("GG%", Pagination::page(1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(executor.calls().is_empty());
    }
}
