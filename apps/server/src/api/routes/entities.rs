//! Entity API routes
//!
//! Every entity gets the generic record routes under `/api/<entity>`; entry
//! children add `/entry/:pdb_id`, and each store adds its own filters under
//! `/filter/...` and aggregates under `/stats/...`.

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{queries, records};
use crate::db::entities::{
    AuthorStore, ChainStore, CitationStore, ExperimentStore, FundingStore, LigandStore,
    MacromoleculeStore, OrganismStore, ProteinStore, SoftwareStore, VersionStore,
};
use crate::db::{EntityStore, EntryLookup};
use crate::state::AppState;

/// All entity routers nested under `/api`.
pub fn entity_routes() -> Router<AppState> {
    Router::new()
        .merge(nested::<ProteinStore>(
            record_routes::<ProteinStore>()
                .route("/filter/resolution", get(queries::protein_resolution))
                .route("/filter/release-date", get(queries::protein_release_date))
                .route("/stats/classifications", get(queries::protein_classifications))
                .route("/stats/release-years", get(queries::protein_release_years)),
        ))
        .merge(nested::<ChainStore>(
            entry_routes::<ChainStore>()
                .route("/filter/motif", get(queries::chain_motif))
                .route("/stats/lengths", get(queries::chain_lengths)),
        ))
        .merge(nested::<LigandStore>(
            entry_routes::<LigandStore>()
                .route("/filter/weight", get(queries::ligand_weight))
                .route("/stats/most-common", get(queries::ligand_most_common)),
        ))
        .merge(nested::<OrganismStore>(
            entry_routes::<OrganismStore>()
                .route("/filter/taxonomy", get(queries::organism_taxonomy))
                .route("/stats/top", get(queries::organism_top)),
        ))
        .merge(nested::<CitationStore>(
            entry_routes::<CitationStore>()
                .route("/filter/year", get(queries::citation_year))
                .route("/stats/journals", get(queries::citation_journals)),
        ))
        .merge(nested::<ExperimentStore>(
            entry_routes::<ExperimentStore>()
                .route("/stats/methods", get(queries::experiment_methods))
                .route(
                    "/stats/resolution-histogram",
                    get(queries::experiment_histogram),
                ),
        ))
        .merge(nested::<MacromoleculeStore>(
            entry_routes::<MacromoleculeStore>()
                .route("/stats/types", get(queries::macromolecule_types)),
        ))
        .merge(nested::<SoftwareStore>(
            entry_routes::<SoftwareStore>().route("/stats/usage", get(queries::software_usage)),
        ))
        .merge(nested::<VersionStore>(
            entry_routes::<VersionStore>().route("/stats/latest", get(queries::version_latest)),
        ))
        .merge(nested::<AuthorStore>(
            entry_routes::<AuthorStore>().route("/stats/top", get(queries::author_top)),
        ))
        .merge(nested::<FundingStore>(
            entry_routes::<FundingStore>().route("/stats/agencies", get(queries::funding_agencies)),
        ))
}

fn nested<E: EntityStore>(routes: Router<AppState>) -> Router<AppState> {
    Router::new().nest(&format!("/api/{}", E::PATH), routes)
}

/// Search, create, read, update and delete.
fn record_routes<E: EntityStore>() -> Router<AppState> {
    Router::new()
        .route("/", get(records::search::<E>).post(records::create::<E>))
        .route("/search", post(records::search_body::<E>))
        .route(
            "/:id",
            get(records::read::<E>)
                .put(records::update::<E>)
                .delete(records::delete::<E>),
        )
}

fn entry_routes<E: EntryLookup>() -> Router<AppState> {
    record_routes::<E>().route("/entry/:pdb_id", get(records::by_entry::<E>))
}
