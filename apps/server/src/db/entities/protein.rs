use chrono::NaiveDate;
use molstore_query::{
    Pagination, Record, RecordEnvelope, RelationshipDescriptor, Scalar, SearchPredicate,
    SearchRequest, SortDirection, SortSpec, TextSearch,
};
use std::sync::Arc;

use super::{check_top_n, normalize_pdb_id, EntityStore, Stores};
use crate::db::executor::Executor;
use crate::db::store::RecordStore;
use crate::{Error, Result};

molstore_query::columns! {
    pub enum ProteinColumn in "protein_info" {
        PdbId => "pdb_id": Text,
        Title => "title": Text,
        Classification => "classification": Text,
        Keywords => "keywords": Text,
        DepositionDate => "deposition_date": Date,
        ReleaseDate => "release_date": Date,
        Resolution => "resolution": Float,
        RWork => "r_work": Float,
        RFree => "r_free": Float,
        StructureWeight => "structure_weight": Float,
        AtomCount => "atom_count": Integer,
        ResidueCount => "residue_count": Integer,
        PolymerCount => "polymer_count": Integer,
    }
}

/// PDB entries (`protein_info`), keyed by PDB id.
#[derive(Clone)]
pub struct ProteinStore {
    records: RecordStore<ProteinColumn>,
}

impl EntityStore for ProteinStore {
    type Column = ProteinColumn;

    const PATH: &'static str = "proteins";
    const PRIMARY_KEY: ProteinColumn = ProteinColumn::PdbId;
    const DEFAULT_SORT: SortSpec<ProteinColumn> = SortSpec {
        column: ProteinColumn::ReleaseDate,
        direction: SortDirection::Desc,
    };
    const SORTABLE: &'static [ProteinColumn] = &[
        ProteinColumn::PdbId,
        ProteinColumn::Title,
        ProteinColumn::Classification,
        ProteinColumn::DepositionDate,
        ProteinColumn::ReleaseDate,
        ProteinColumn::Resolution,
        ProteinColumn::StructureWeight,
        ProteinColumn::AtomCount,
        ProteinColumn::ResidueCount,
    ];
    const TEXT_COLUMNS: &'static [ProteinColumn] = &[
        ProteinColumn::PdbId,
        ProteinColumn::Title,
        ProteinColumn::Classification,
        ProteinColumn::Keywords,
    ];
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[
        RelationshipDescriptor::has_many("chains", "chains", "id", "pdb_id", "pdb_id"),
        RelationshipDescriptor::has_many(
            "macromolecules",
            "macromolecules",
            "id",
            "pdb_id",
            "pdb_id",
        ),
        RelationshipDescriptor::has_many("citations", "citations", "id", "pdb_id", "pdb_id"),
        RelationshipDescriptor::has_many(
            "experimental_data",
            "experimental_data",
            "id",
            "pdb_id",
            "pdb_id",
        ),
        RelationshipDescriptor::has_many("software", "software_used", "id", "pdb_id", "pdb_id"),
        RelationshipDescriptor::has_many(
            "versions",
            "version_history",
            "id",
            "pdb_id",
            "pdb_id",
        ),
        RelationshipDescriptor::has_many("authors", "authors", "id", "pdb_id", "pdb_id"),
        RelationshipDescriptor::has_many("funding", "funding", "id", "pdb_id", "pdb_id"),
        RelationshipDescriptor::many_to_many(
            "ligands",
            "ligands",
            "id",
            "entry_ligands",
            "pdb_id",
            "ligand_id",
            "pdb_id",
        ),
        RelationshipDescriptor::many_to_many(
            "organisms",
            "organisms",
            "id",
            "entry_organisms",
            "pdb_id",
            "organism_id",
            "pdb_id",
        ),
    ];

    fn records(&self) -> &RecordStore<ProteinColumn> {
        &self.records
    }

    fn select(stores: &Stores) -> &Self {
        &stores.proteins
    }

    fn parse_id(raw: &str) -> Result<Scalar> {
        normalize_pdb_id(raw).map(Scalar::Text)
    }
}

impl ProteinStore {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            records: RecordStore::new(executor, ProteinColumn::PdbId),
        }
    }

    /// Entries whose resolution (in Å) falls in `[min, max]`, best first.
    pub async fn by_resolution_range(
        &self,
        min: Option<f64>,
        max: Option<f64>,
        pagination: Pagination,
    ) -> Result<RecordEnvelope<Record>> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(Error::Validation(format!(
                    "Minimum resolution {min} exceeds maximum {max}"
                )));
            }
        }

        let mut request =
            SearchRequest::new(pagination, SortSpec::asc(ProteinColumn::Resolution));
        if let Some(predicate) = SearchPredicate::between(
            ProteinColumn::Resolution,
            min.map(Scalar::Float),
            max.map(Scalar::Float),
        )? {
            request = request.with_predicate(predicate);
        }
        self.records.search(&request).await
    }

    /// Entries released between `from` and `to` inclusive, newest first.
    pub async fn by_release_date_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        pagination: Pagination,
    ) -> Result<RecordEnvelope<Record>> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(Error::Validation(format!(
                    "Release date range starts after it ends ({from} > {to})"
                )));
            }
        }

        let mut request = Self::request(pagination);
        if let Some(predicate) = SearchPredicate::between(
            ProteinColumn::ReleaseDate,
            from.map(Scalar::Date),
            to.map(Scalar::Date),
        )? {
            request = request.with_predicate(predicate);
        }
        self.records.search(&request).await
    }

    /// Free text over id, title, classification and keywords.
    pub async fn search_text(
        &self,
        term: &str,
        pagination: Pagination,
    ) -> Result<RecordEnvelope<Record>> {
        let request =
            Self::request(pagination).with_text(TextSearch::new(term, Self::TEXT_COLUMNS));
        self.records.search(&request).await
    }

    /// Most populated classifications with their entry counts.
    pub async fn classification_stats(&self, top_n: u32) -> Result<Vec<Record>> {
        let top_n = check_top_n(top_n)?;
        let sql = "SELECT jsonb_build_object('classification', s.classification, 'count', s.count) AS record \
                   FROM (SELECT classification, COUNT(*) AS count FROM protein_info \
                         WHERE classification IS NOT NULL \
                         GROUP BY classification \
                         ORDER BY count DESC, classification \
                         LIMIT $1) s \
                   ORDER BY s.count DESC, s.classification";
        self.records
            .fetch("classification_stats", None, sql, &[Scalar::from(top_n)])
            .await
    }

    /// Entries released per year, with the mean resolution of that year.
    pub async fn release_year_stats(&self) -> Result<Vec<Record>> {
        let sql = "SELECT jsonb_build_object('year', s.year, 'count', s.count, \
                          'average_resolution', s.average_resolution) AS record \
                   FROM (SELECT EXTRACT(YEAR FROM release_date)::int AS year, COUNT(*) AS count, \
                                AVG(resolution) AS average_resolution \
                         FROM protein_info \
                         WHERE release_date IS NOT NULL \
                         GROUP BY 1) s \
                   ORDER BY s.year";
        self.records.fetch("release_year_stats", None, sql, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{record, MemoryExecutor};
    use serde_json::json;

    fn counting_executor() -> Arc<MemoryExecutor> {
        Arc::new(MemoryExecutor::new(|sql, _| {
            if sql.contains("'total'") {
                Ok(vec![record(json!({"total": 0}))])
            } else {
                Ok(Vec::new())
            }
        }))
    }

    #[tokio::test]
    async fn resolution_range_is_inclusive_and_sorted_best_first() {
        let executor = counting_executor();
        let store = ProteinStore::new(executor.clone());

        store
            .by_resolution_range(Some(1.5), Some(2.0), Pagination::page(1, 20))
            .await
            .unwrap();

        let calls = executor.calls();
        let (sql, params) = calls.iter().find(|(sql, _)| sql.contains("LIMIT")).unwrap();
        assert_eq!(
            sql,
            "SELECT to_jsonb(t) AS record FROM protein_info t \
             WHERE (resolution >= $1 AND resolution <= $2) \
             ORDER BY resolution ASC NULLS LAST, pdb_id ASC LIMIT $3 OFFSET $4"
        );
        assert_eq!(params[..2], [Scalar::Float(1.5), Scalar::Float(2.0)]);
    }

    #[tokio::test]
    async fn inverted_ranges_are_rejected() {
        let executor = counting_executor();
        let store = ProteinStore::new(executor.clone());

        let err = store
            .by_resolution_range(Some(3.0), Some(1.0), Pagination::page(1, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn text_search_shares_one_escaped_parameter() {
        let executor = counting_executor();
        let store = ProteinStore::new(executor.clone());

        store
            .search_text("50%_kinase", Pagination::page(1, 10))
            .await
            .unwrap();

        let calls = executor.calls();
        let (sql, params) = calls.iter().find(|(sql, _)| sql.contains("LIMIT")).unwrap();
        assert!(sql.contains(
            "WHERE (pdb_id ILIKE $1 OR title ILIKE $1 OR classification ILIKE $1 OR keywords ILIKE $1)"
        ));
        assert_eq!(
            params,
            &vec![
                Scalar::from("%50\\%\\_kinase%"),
                Scalar::Int(10),
                Scalar::Int(0)
            ]
        );
    }

    #[tokio::test]
    async fn classification_stats_binds_capped_top_n() {
        let executor = Arc::new(MemoryExecutor::empty());
        let store = ProteinStore::new(executor.clone());

        store.classification_stats(500).await.unwrap();

        let calls = executor.calls();
        assert!(calls[0].0.contains("GROUP BY classification"));
        assert_eq!(calls[0].1, vec![Scalar::Int(100)]);
    }

    #[test]
    fn path_ids_are_normalized() {
        assert_eq!(
            ProteinStore::parse_id("4hhb").unwrap(),
            Scalar::Text("4HHB".to_string())
        );
    }
}
