//! Entity stores
//!
//! One store per table. Each wraps a [`RecordStore`] with the table's sort
//! allow-list, default order, free-text columns and relationships, and adds
//! the hand-written queries that the generic store cannot express
//! (aggregates, window functions, junction lookups).

mod author;
mod chain;
mod citation;
mod experiment;
mod funding;
mod ligand;
mod macromolecule;
mod organism;
mod protein;
mod software;
mod version;

pub use author::{AuthorColumn, AuthorStore};
pub use chain::{ChainColumn, ChainStore};
pub use citation::{CitationColumn, CitationStore};
pub use experiment::{ExperimentColumn, ExperimentStore};
pub use funding::{FundingColumn, FundingStore};
pub use ligand::{LigandColumn, LigandStore};
pub use macromolecule::{MacromoleculeColumn, MacromoleculeStore};
pub use organism::{OrganismColumn, OrganismStore};
pub use protein::{ProteinColumn, ProteinStore};
pub use software::{SoftwareColumn, SoftwareStore};
pub use version::{VersionColumn, VersionStore};

use async_trait::async_trait;
use molstore_query::{
    Column, FieldSet, Pagination, Record, RelationshipDescriptor, Scalar, SearchPredicate,
    SearchRequest, SortSpec,
};
use std::sync::Arc;

use super::executor::Executor;
use super::store::RecordStore;
use crate::{Error, Result};

/// Upper bound for every `top_n` style argument.
pub const MAX_TOP_N: u32 = 100;

/// Column name shared by every table keyed to an entry.
const PDB_ID: &str = "pdb_id";

/// Belongs-to link from a child table back to its entry.
pub(crate) const ENTRY: RelationshipDescriptor =
    RelationshipDescriptor::belongs_to("entry", "protein_info", "pdb_id", "pdb_id");

/// Static description of an entity table plus access to its record store.
pub trait EntityStore: Send + Sync + 'static {
    type Column: Column;

    /// Path segment under `/api` and the `entity` metric label.
    const PATH: &'static str;
    const PRIMARY_KEY: Self::Column;
    const DEFAULT_SORT: SortSpec<Self::Column>;
    const SORTABLE: &'static [Self::Column];
    /// Columns matched by the free-text `q` parameter.
    const TEXT_COLUMNS: &'static [Self::Column];
    /// Attached by single-record reads.
    const RELATIONSHIPS: &'static [RelationshipDescriptor];

    fn records(&self) -> &RecordStore<Self::Column>;

    /// This store's slot in [`Stores`].
    fn select(stores: &Stores) -> &Self;

    /// Coerce a raw path id into the primary key's type.
    fn parse_id(raw: &str) -> Result<Scalar> {
        let pk = Self::PRIMARY_KEY;
        Ok(pk.kind().parse_text(pk.name(), raw)?)
    }

    /// Canonical form of a value bound to `column`; PDB ids are uppercased.
    fn normalize_value(column: Self::Column, value: Scalar) -> Result<Scalar> {
        match value {
            Scalar::Text(raw) if column.name() == PDB_ID => {
                normalize_pdb_id(&raw).map(Scalar::Text)
            }
            value => Ok(value),
        }
    }

    /// Apply [`normalize_value`](Self::normalize_value) to a create or update.
    fn normalize_fields(fields: FieldSet<Self::Column>) -> Result<FieldSet<Self::Column>> {
        fields
            .into_iter()
            .map(|(column, value)| Ok((column, Self::normalize_value(column, value)?)))
            .collect()
    }

    /// Apply [`normalize_value`](Self::normalize_value) to every filter leaf.
    fn normalize_predicate(
        predicate: SearchPredicate<Self::Column>,
    ) -> Result<SearchPredicate<Self::Column>> {
        predicate.try_map_values(&mut Self::normalize_value)
    }

    /// Unfiltered request in the default order.
    fn request(pagination: Pagination) -> SearchRequest<Self::Column> {
        SearchRequest::new(pagination, Self::DEFAULT_SORT)
    }
}

/// Stores whose rows belong to one PDB entry.
#[async_trait]
pub trait EntryLookup: EntityStore {
    /// Rows of the entry, in the store's natural order for one entry.
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>>;
}

/// All entity stores, sharing one executor.
#[derive(Clone)]
pub struct Stores {
    pub proteins: ProteinStore,
    pub chains: ChainStore,
    pub ligands: LigandStore,
    pub organisms: OrganismStore,
    pub citations: CitationStore,
    pub experiments: ExperimentStore,
    pub macromolecules: MacromoleculeStore,
    pub software: SoftwareStore,
    pub versions: VersionStore,
    pub authors: AuthorStore,
    pub funding: FundingStore,
}

impl Stores {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            proteins: ProteinStore::new(executor.clone()),
            chains: ChainStore::new(executor.clone()),
            ligands: LigandStore::new(executor.clone()),
            organisms: OrganismStore::new(executor.clone()),
            citations: CitationStore::new(executor.clone()),
            experiments: ExperimentStore::new(executor.clone()),
            macromolecules: MacromoleculeStore::new(executor.clone()),
            software: SoftwareStore::new(executor.clone()),
            versions: VersionStore::new(executor.clone()),
            authors: AuthorStore::new(executor.clone()),
            funding: FundingStore::new(executor),
        }
    }
}

/// Trim and uppercase a PDB id (`1abc` -> `1ABC`).
///
/// Accepts classic four-character ids and the extended `PDB_0000XXXX` form.
pub fn normalize_pdb_id(raw: &str) -> Result<String> {
    let id = raw.trim();
    let valid = (4..=12).contains(&id.len())
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(Error::Validation(format!("Invalid PDB id '{raw}'")));
    }
    Ok(id.to_ascii_uppercase())
}

/// Validate a `top_n` argument, capping it at [`MAX_TOP_N`].
pub fn check_top_n(top_n: u32) -> Result<u32> {
    if top_n == 0 {
        return Err(Error::Validation("top_n must be at least 1".to_string()));
    }
    Ok(top_n.min(MAX_TOP_N))
}

/// Rows of `records` whose `column` equals the normalized `pdb_id`.
async fn entry_rows<C: Column>(
    records: &RecordStore<C>,
    column: C,
    pdb_id: &str,
    sort: SortSpec<C>,
) -> Result<Vec<Record>> {
    let pdb_id = normalize_pdb_id(pdb_id)?;
    let predicate = molstore_query::SearchPredicate::eq(column, pdb_id)?;
    records.find(Some(&predicate), sort, None).await
}
