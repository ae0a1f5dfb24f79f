use async_trait::async_trait;
use molstore_query::{
    Pagination, Record, RecordEnvelope, RelationshipDescriptor, Scalar, SearchPredicate,
    SortDirection, SortSpec,
};
use std::sync::Arc;

use super::{check_top_n, normalize_pdb_id, EntityStore, EntryLookup, Stores};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::{Error, Result};

molstore_query::columns! {
    pub enum LigandColumn in "ligands" {
        Id => "id": Integer,
        LigandCode => "ligand_code": Text,
        Name => "name": Text,
        Formula => "formula": Text,
        MolecularWeight => "molecular_weight": Float,
        LigandType => "ligand_type": Text,
    }
}

/// Small-molecule ligands, linked to entries through `entry_ligands`.
#[derive(Clone)]
pub struct LigandStore {
    records: RecordStore<LigandColumn>,
}

impl EntityStore for LigandStore {
    type Column = LigandColumn;

    const PATH: &'static str = "ligands";
    const PRIMARY_KEY: LigandColumn = LigandColumn::Id;
    const DEFAULT_SORT: SortSpec<LigandColumn> = SortSpec {
        column: LigandColumn::LigandCode,
        direction: SortDirection::Asc,
    };
    const SORTABLE: &'static [LigandColumn] = &[
        LigandColumn::Id,
        LigandColumn::LigandCode,
        LigandColumn::Name,
        LigandColumn::MolecularWeight,
        LigandColumn::LigandType,
    ];
    const TEXT_COLUMNS: &'static [LigandColumn] = &[
        LigandColumn::LigandCode,
        LigandColumn::Name,
        LigandColumn::Formula,
    ];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] =
        &[RelationshipDescriptor::many_to_many(
            "entries",
            "protein_info",
            "pdb_id",
            "entry_ligands",
            "ligand_id",
            "pdb_id",
            "id",
        )];

    fn records(&self) -> &RecordStore<LigandColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.ligands
    }
}

#[async_trait]
impl EntryLookup for LigandStore {
    /// Ligands bound in the entry, one row per chain binding site.
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        let pdb_id = normalize_pdb_id(pdb_id)?;
        let sql = "SELECT to_jsonb(l) || jsonb_build_object('chain_id', el.chain_id, \
                          'instance_count', el.instance_count) AS record \
                   FROM ligands l \
                   INNER JOIN entry_ligands el ON el.ligand_id = l.id \
                   WHERE el.pdb_id = $1 \
                   ORDER BY l.ligand_code, el.chain_id NULLS FIRST";
        let target = Scalar::Text(pdb_id);
        self.records
            .fetch("by_pdb_id", Some(&target), sql, std::slice::from_ref(&target))
            .await
    }
}

impl LigandStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, LigandColumn::Id),
        }
    }

    /// Ligands found in the most entries.
    ///
    /// Only ligands present in at least `min_entries` distinct entries are
    /// considered.
    pub async fn most_common(&self, top_n: u32, min_entries: u32) -> Result<Vec<Record>> {
        let top_n = check_top_n(top_n)?;
        let sql = "SELECT to_jsonb(l) || jsonb_build_object('entry_count', s.entry_count) AS record \
                   FROM (SELECT ligand_id, COUNT(DISTINCT pdb_id) AS entry_count \
                         FROM entry_ligands \
                         GROUP BY ligand_id \
                         HAVING COUNT(DISTINCT pdb_id) >= $1) s \
                   INNER JOIN ligands l ON l.id = s.ligand_id \
                   ORDER BY s.entry_count DESC, l.ligand_code \
                   LIMIT $2";
        self.records
            .fetch(
                "most_common",
                None,
                sql,
                &[Scalar::from(min_entries.max(1)), Scalar::from(top_n)],
            )
            .await
    }

    /// Ligands with molecular weight (Da) in `[min, max]`, lightest first.
    pub async fn by_weight_range(
        &self,
        min: Option<f64>,
        max: Option<f64>,
        pagination: Pagination,
    ) -> Result<RecordEnvelope<Record>> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(Error::Validation(format!(
                    "Minimum weight {min} exceeds maximum {max}"
                )));
            }
        }

        let mut request = molstore_query::SearchRequest::new(
            pagination,
            SortSpec::asc(LigandColumn::MolecularWeight),
        );
        if let Some(predicate) = SearchPredicate::between(
            LigandColumn::MolecularWeight,
            min.map(Scalar::Float),
            max.map(Scalar::Float),
        )? {
            request = request.with_predicate(predicate);
        }
        self.records.search(&request).await
    }
}
