use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use aerobook_catalog::Flight;
use aerobook_core::search::SearchRequest;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub request_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights/search", post(submit_search))
        .route("/flights/results", get(search_results))
}

async fn submit_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<(StatusCode, String), AppError> {
    let Json(req) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let handle = state.search.submit(req).await?;
    info!("Search accepted: {}", handle);
    Ok((StatusCode::ACCEPTED, handle))
}

async fn search_results(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Vec<Flight>>, AppError> {
    let handle = query
        .request_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::ValidationError("request_id is required".to_string()))?;

    let flights = state.results.poll(&handle, &state.poll).await?;
    Ok(Json(flights))
}
