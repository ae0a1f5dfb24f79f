//! Handlers for the entity-specific filters and statistics
//!
//! Parameters come from the query string through [`QueryParams`]; paged
//! filters honour the usual `page` / `limit` / `offset` keys.

use axum::{
    extract::{RawQuery, State},
    Json,
};
use chrono::NaiveDate;
use molstore_query::{Record, RecordEnvelope};

use crate::api::params::QueryParams;
use crate::state::AppState;
use crate::{Error, Result};

const DEFAULT_TOP_N: u32 = 10;

type Rows = Result<Json<Vec<Record>>>;
type Page = Result<Json<RecordEnvelope<Record>>>;

fn query_params(raw: Option<String>) -> QueryParams {
    QueryParams::parse(raw.as_deref())
}

fn top_n(params: &QueryParams) -> Result<u32> {
    Ok(params.parsed("top")?.unwrap_or(DEFAULT_TOP_N))
}

// proteins

pub async fn protein_resolution(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Page {
    let params = query_params(raw);
    let pagination = params.pagination(&state.config.search)?;
    let envelope = state
        .stores
        .proteins
        .by_resolution_range(params.float("min")?, params.float("max")?, pagination)
        .await?;
    Ok(Json(envelope))
}

pub async fn protein_release_date(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Page {
    let params = query_params(raw);
    let pagination = params.pagination(&state.config.search)?;
    let envelope = state
        .stores
        .proteins
        .by_release_date_range(
            params.parsed::<NaiveDate>("from")?,
            params.parsed::<NaiveDate>("to")?,
            pagination,
        )
        .await?;
    Ok(Json(envelope))
}

pub async fn protein_classifications(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Rows {
    let top = top_n(&query_params(raw))?;
    Ok(Json(state.stores.proteins.classification_stats(top).await?))
}

pub async fn protein_release_years(State(state): State<AppState>) -> Rows {
    Ok(Json(state.stores.proteins.release_year_stats().await?))
}

// chains

pub async fn chain_motif(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Page {
    let params = query_params(raw);
    let motif = params
        .get("motif")
        .ok_or_else(|| Error::Validation("Missing required parameter 'motif'".to_string()))?;
    let pagination = params.pagination(&state.config.search)?;
    Ok(Json(
        state.stores.chains.by_sequence_motif(motif, pagination).await?,
    ))
}

pub async fn chain_lengths(State(state): State<AppState>) -> Rows {
    Ok(Json(state.stores.chains.length_stats().await?))
}

// ligands

pub async fn ligand_weight(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Page {
    let params = query_params(raw);
    let pagination = params.pagination(&state.config.search)?;
    let envelope = state
        .stores
        .ligands
        .by_weight_range(params.float("min")?, params.float("max")?, pagination)
        .await?;
    Ok(Json(envelope))
}

pub async fn ligand_most_common(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Rows {
    let params = query_params(raw);
    let min_entries = params.parsed("min_entries")?.unwrap_or(1);
    Ok(Json(
        state
            .stores
            .ligands
            .most_common(top_n(&params)?, min_entries)
            .await?,
    ))
}

// organisms

pub async fn organism_taxonomy(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Record>> {
    let taxonomy_id: i64 = query_params(raw)
        .parsed("taxonomy_id")?
        .ok_or_else(|| Error::Validation("Missing required parameter 'taxonomy_id'".to_string()))?;
    state
        .stores
        .organisms
        .by_taxonomy_id(taxonomy_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("organisms with taxonomy_id {taxonomy_id}")))
}

pub async fn organism_top(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Rows {
    let top = top_n(&query_params(raw))?;
    Ok(Json(state.stores.organisms.top_organisms(top).await?))
}

// citations

pub async fn citation_year(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Page {
    let params = query_params(raw);
    let pagination = params.pagination(&state.config.search)?;
    let envelope = state
        .stores
        .citations
        .by_year_range(params.parsed("from")?, params.parsed("to")?, pagination)
        .await?;
    Ok(Json(envelope))
}

pub async fn citation_journals(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Rows {
    let top = top_n(&query_params(raw))?;
    Ok(Json(state.stores.citations.journal_stats(top).await?))
}

// experiments

pub async fn experiment_methods(State(state): State<AppState>) -> Rows {
    Ok(Json(state.stores.experiments.method_stats().await?))
}

pub async fn experiment_histogram(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Rows {
    let width = query_params(raw).float("bucket_width")?.unwrap_or(0.5);
    Ok(Json(
        state.stores.experiments.resolution_histogram(width).await?,
    ))
}

// remaining entry children

pub async fn macromolecule_types(State(state): State<AppState>) -> Rows {
    Ok(Json(state.stores.macromolecules.type_stats().await?))
}

pub async fn software_usage(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Rows {
    let top = top_n(&query_params(raw))?;
    Ok(Json(state.stores.software.usage_stats(top).await?))
}

pub async fn version_latest(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Rows {
    let limit = query_params(raw)
        .parsed("limit")?
        .unwrap_or(state.config.search.default_limit);
    Ok(Json(state.stores.versions.latest_revisions(limit).await?))
}

pub async fn author_top(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Rows {
    let top = top_n(&query_params(raw))?;
    Ok(Json(state.stores.authors.top_authors(top).await?))
}

pub async fn funding_agencies(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Rows {
    let top = top_n(&query_params(raw))?;
    Ok(Json(state.stores.funding.agency_stats(top).await?))
}
