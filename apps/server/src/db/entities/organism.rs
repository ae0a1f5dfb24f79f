use async_trait::async_trait;
use molstore_query::{Record, RelationshipDescriptor, Scalar, SearchPredicate, SortDirection, SortSpec};
use std::sync::Arc;

use super::{check_top_n, normalize_pdb_id, EntityStore, EntryLookup, Stores};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::Result;

molstore_query::columns! {
    pub enum OrganismColumn in "organisms" {
        Id => "id": Integer,
        ScientificName => "scientific_name": Text,
        CommonName => "common_name": Text,
        TaxonomyId => "taxonomy_id": Integer,
        Strain => "strain": Text,
    }
}

/// Source organisms, linked to entries through `entry_organisms`.
#[derive(Clone)]
pub struct OrganismStore {
    records: RecordStore<OrganismColumn>,
}

impl EntityStore for OrganismStore {
    type Column = OrganismColumn;

    const PATH: &'static str = "organisms";
    const PRIMARY_KEY: OrganismColumn = OrganismColumn::Id;
    const DEFAULT_SORT: SortSpec<OrganismColumn> = SortSpec {
        column: OrganismColumn::ScientificName,
        direction: SortDirection::Asc,
    };
    const SORTABLE: &'static [OrganismColumn] = &[
        OrganismColumn::Id,
        OrganismColumn::ScientificName,
        OrganismColumn::CommonName,
        OrganismColumn::TaxonomyId,
    ];
    const TEXT_COLUMNS: &'static [OrganismColumn] = &[
        OrganismColumn::ScientificName,
        OrganismColumn::CommonName,
        OrganismColumn::Strain,
    ];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] =
        &[RelationshipDescriptor::many_to_many(
            "entries",
            "protein_info",
            "pdb_id",
            "entry_organisms",
            "organism_id",
            "pdb_id",
            "id",
        )];

    fn records(&self) -> &RecordStore<OrganismColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.organisms
    }
}

#[async_trait]
impl EntryLookup for OrganismStore {
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        let target = Scalar::Text(normalize_pdb_id(pdb_id)?);
        let sql = "SELECT to_jsonb(o) || jsonb_build_object('role', eo.role) AS record \
                   FROM organisms o \
                   INNER JOIN entry_organisms eo ON eo.organism_id = o.id \
                   WHERE eo.pdb_id = $1 \
                   ORDER BY eo.role, o.scientific_name";
        self.records
            .fetch("by_pdb_id", Some(&target), sql, std::slice::from_ref(&target))
            .await
    }
}

impl OrganismStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, OrganismColumn::Id),
        }
    }

    /// Organism with the given NCBI taxonomy id.
    pub async fn by_taxonomy_id(&self, taxonomy_id: i64) -> Result<Option<Record>> {
        let predicate = SearchPredicate::eq(OrganismColumn::TaxonomyId, taxonomy_id)?;
        let rows = self
            .records
            .find(Some(&predicate), Self::DEFAULT_SORT, Some(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Organisms that are the source of the most entries.
    pub async fn top_organisms(&self, top_n: u32) -> Result<Vec<Record>> {
        let top_n = check_top_n(top_n)?;
        let sql = "SELECT to_jsonb(o) || jsonb_build_object('entry_count', s.entry_count) AS record \
                   FROM (SELECT organism_id, COUNT(DISTINCT pdb_id) AS entry_count \
                         FROM entry_organisms \
                         GROUP BY organism_id) s \
                   INNER JOIN organisms o ON o.id = s.organism_id \
                   ORDER BY s.entry_count DESC, o.scientific_name \
                   LIMIT $1";
        self.records
            .fetch("top_organisms", None, sql, &[Scalar::from(top_n)])
            .await
    }
}
