use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;
use aerobook_booking::ReconciliationReport;
use aerobook_catalog::Flight;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights/{id}/overbooking/tune", post(tune_ratios))
        .route("/flights/{id}/overbooking/reconcile", post(reconcile))
}

async fn tune_ratios(State(state): State<AppState>, Path(flight_id): Path<Uuid>) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.tuner.tune(flight_id).await?))
}

async fn reconcile(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<ReconciliationReport>, AppError> {
    let report = state.reconciler.reconcile(flight_id).await?;
    info!(
        "Reconciled flight {}: {} resolved, {} unresolved",
        flight_id,
        report.resolved(),
        report.unresolved.len()
    );
    Ok(Json(report))
}
