//! Generic record handlers, instantiated once per entity store

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use molstore_query::{
    field_set_from_json, PageRequest, PredicateInput, Record, RecordEnvelope, SortSpec, TextSearch,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::api::params::QueryParams;
use crate::db::{EntityStore, EntryLookup};
use crate::state::AppState;
use crate::{Error, Result};

/// `POST /api/<entity>/search` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchBody {
    pub predicate: Option<PredicateInput>,
    pub q: Option<String>,
    #[serde(flatten)]
    pub paging: PageRequest,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

/// `GET /api/<entity>?...`
pub async fn search<E: EntityStore>(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<RecordEnvelope<Record>>> {
    let request = QueryParams::parse(raw.as_deref())
        .search_request::<E>(&state.config.search)?;
    let envelope = E::select(&state.stores).records().search(&request).await?;
    Ok(Json(envelope))
}

/// `POST /api/<entity>/search` with a nested AND/OR predicate.
pub async fn search_body<E: EntityStore>(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<RecordEnvelope<Record>>> {
    let search = &state.config.search;
    let sort = SortSpec::resolve(
        body.sort.as_deref(),
        body.direction.as_deref(),
        E::SORTABLE,
        E::DEFAULT_SORT,
    );
    let mut request = molstore_query::SearchRequest::new(
        body.paging.resolve(search.default_limit, search.max_limit),
        sort,
    );
    if let Some(predicate) = &body.predicate {
        request = request.with_predicate(E::normalize_predicate(predicate.resolve()?)?);
    }
    if let Some(term) = body.q.as_deref().filter(|t| !t.trim().is_empty()) {
        request = request.with_text(TextSearch::new(term, E::TEXT_COLUMNS));
    }

    let envelope = E::select(&state.stores).records().search(&request).await?;
    Ok(Json(envelope))
}

/// `GET /api/<entity>/:id`, with relationships attached.
pub async fn read<E: EntityStore>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Record>> {
    let id = E::parse_id(&raw_id)?;
    E::select(&state.stores)
        .records()
        .read_with_relationships(&id, E::RELATIONSHIPS)
        .await?
        .map(Json)
        .ok_or_else(|| not_found::<E>(&raw_id))
}

/// `POST /api/<entity>`
pub async fn create<E: EntityStore>(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    let fields = E::normalize_fields(field_set_from_json(object_body(&body)?)?)?;
    let record = E::select(&state.stores).records().create(&fields).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `PUT /api/<entity>/:id` - only the supplied columns change.
pub async fn update<E: EntityStore>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<Record>> {
    let id = E::parse_id(&raw_id)?;
    let fields = E::normalize_fields(field_set_from_json(object_body(&body)?)?)?;
    E::select(&state.stores)
        .records()
        .update(&id, &fields)
        .await?
        .map(Json)
        .ok_or_else(|| not_found::<E>(&raw_id))
}

/// `DELETE /api/<entity>/:id` - responds with the removed row.
pub async fn delete<E: EntityStore>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Record>> {
    let id = E::parse_id(&raw_id)?;
    E::select(&state.stores)
        .records()
        .delete(&id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found::<E>(&raw_id))
}

/// `GET /api/<entity>/entry/:pdb_id`
pub async fn by_entry<E: EntryLookup>(
    State(state): State<AppState>,
    Path(pdb_id): Path<String>,
) -> Result<Json<Vec<Record>>> {
    let rows = E::select(&state.stores).by_pdb_id(&pdb_id).await?;
    Ok(Json(rows))
}

fn object_body(body: &JsonValue) -> Result<&serde_json::Map<String, JsonValue>> {
    body.as_object()
        .ok_or_else(|| Error::Validation("Request body must be a JSON object".to_string()))
}

fn not_found<E: EntityStore>(raw_id: &str) -> Error {
    Error::NotFound(format!("{}/{}", E::PATH, raw_id))
}
