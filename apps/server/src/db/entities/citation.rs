use async_trait::async_trait;
use molstore_query::{
    Pagination, Record, RecordEnvelope, RelationshipDescriptor, Scalar, SearchPredicate,
    SortDirection, SortSpec,
};
use std::sync::Arc;

use super::{check_top_n, entry_rows, EntityStore, EntryLookup, Stores, ENTRY};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::{Error, Result};

molstore_query::columns! {
    pub enum CitationColumn in "citations" {
        Id => "id": Integer,
        PdbId => "pdb_id": Text,
        Title => "title": Text,
        Journal => "journal": Text,
        Volume => "volume": Text,
        FirstPage => "first_page": Text,
        LastPage => "last_page": Text,
        Year => "year": Integer,
        Doi => "doi": Text,
        PubmedId => "pubmed_id": Integer,
        IsPrimary => "is_primary": Boolean,
    }
}

/// Literature citations of an entry.
#[derive(Clone)]
pub struct CitationStore {
    records: RecordStore<CitationColumn>,
}

impl EntityStore for CitationStore {
    type Column = CitationColumn;

    const PATH: &'static str = "citations";
    const PRIMARY_KEY: CitationColumn = CitationColumn::Id;
    const DEFAULT_SORT: SortSpec<CitationColumn> = SortSpec {
        column: CitationColumn::Year,
        direction: SortDirection::Desc,
    };
    const SORTABLE: &'static [CitationColumn] = &[
        CitationColumn::Id,
        CitationColumn::PdbId,
        CitationColumn::Title,
        CitationColumn::Journal,
        CitationColumn::Year,
    ];
    const TEXT_COLUMNS: &'static [CitationColumn] = &[
        CitationColumn::Title,
        CitationColumn::Journal,
        CitationColumn::Doi,
    ];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[ENTRY];

    fn records(&self) -> &RecordStore<CitationColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.citations
    }
}

#[async_trait]
impl EntryLookup for CitationStore {
    /// Primary citation first.
    async fn by_pdb_id(&self, pdb_id: &str) -> Result<Vec<Record>> {
        entry_rows(
            &self.records,
            CitationColumn::PdbId,
            pdb_id,
            SortSpec::desc(CitationColumn::IsPrimary),
        )
        .await
    }
}

impl CitationStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, CitationColumn::Id),
        }
    }

    /// Citations published between `from` and `to` inclusive.
    pub async fn by_year_range(
        &self,
        from: Option<i64>,
        to: Option<i64>,
        pagination: Pagination,
    ) -> Result<RecordEnvelope<Record>> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(Error::Validation(format!(
                    "Year range starts after it ends ({from} > {to})"
                )));
            }
        }

        let mut request = Self::request(pagination);
        if let Some(predicate) = SearchPredicate::between(
            CitationColumn::Year,
            from.map(Scalar::Int),
            to.map(Scalar::Int),
        )? {
            request = request.with_predicate(predicate);
        }
        self.records.search(&request).await
    }

    /// Journals with the most citations, with their publication span.
    pub async fn journal_stats(&self, top_n: u32) -> Result<Vec<Record>> {
        let top_n = check_top_n(top_n)?;
        let sql = "SELECT jsonb_build_object('journal', s.journal, 'count', s.count, \
                          'first_year', s.first_year, 'last_year', s.last_year) AS record \
                   FROM (SELECT journal, COUNT(*) AS count, MIN(year) AS first_year, \
                                MAX(year) AS last_year \
                         FROM citations \
                         WHERE journal IS NOT NULL \
                         GROUP BY journal \
                         ORDER BY count DESC, journal \
                         LIMIT $1) s \
                   ORDER BY s.count DESC, s.journal";
        self.records
            .fetch("journal_stats", None, sql, &[Scalar::from(top_n)])
            .await
    }
}
