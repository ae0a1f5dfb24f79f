use async_trait::async_trait;
use molstore_query::{Record, RelationshipDescriptor, Scalar, SortDirection, SortSpec};
use std::sync::Arc;

use super::{check_top_n, entry_rows, EntityStore, EntryLookup, Stores, ENTRY};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::Result;

molstore_query::columns! {
    pub enum FundingColumn in "funding" {
        Id => "id": Integer,
        PdbId => "pdb_id": Text,
        Agency => "agency": Text,
        GrantNumber => "grant_number": Text,
        Country => "country": Text,
    }
}

/// Funding sources acknowledged by an entry.
#[derive(Clone)]
pub struct FundingStore {
    records: RecordStore<FundingColumn>,
}

impl EntityStore for FundingStore {
    type Column = FundingColumn;

    const PATH: &'static str = "funding";
    const PRIMARY_KEY: FundingColumn = FundingColumn::Id;
    const DEFAULT_SORT: SortSpec<FundingColumn> = SortSpec {
        column: FundingColumn::Agency,
        direction: SortDirection::Asc,
    };
    const SORTABLE: &'static [FundingColumn] = &[
        FundingColumn::Id,
        FundingColumn::PdbId,
        FundingColumn::Agency,
        FundingColumn::Country,
    ];
    const TEXT_COLUMNS: &'static [FundingColumn] = &[
        FundingColumn::Agency,
        FundingColumn::GrantNumber,
        FundingColumn::Country,
    ];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[ENTRY];

    fn records(&self) -> &RecordStore<FundingColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.funding
    }
}

#[async_trait]
impl EntryLookup for FundingStore {
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        entry_rows(&self.records, FundingColumn::PdbId, pdb_id, Self::DEFAULT_SORT).await
    }
}

impl FundingStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, FundingColumn::Id),
        }
    }

    /// Agencies funding the most entries, with how many countries they span.
    pub async fn agency_stats(&self, top_n: u32) -> Result<Vec<Record>> {
        let top_n = check_top_n(top_n)?;
        let sql = "SELECT jsonb_build_object('agency', s.agency, 'entry_count', s.entry_count, \
                          'grant_count', s.grant_count, 'countries', s.countries) AS record \
                   FROM (SELECT agency, COUNT(DISTINCT pdb_id) AS entry_count, \
                                COUNT(DISTINCT grant_number) AS grant_count, \
                                COUNT(DISTINCT country) AS countries \
                         FROM funding \
                         GROUP BY agency \
                         ORDER BY entry_count DESC, agency \
                         LIMIT $1) s \
                   ORDER BY s.entry_count DESC, s.agency";
        self.records
            .fetch("agency_stats", None, sql, &[Scalar::from(top_n)])
            .await
    }
}
