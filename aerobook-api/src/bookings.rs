use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use aerobook_shared::{Booking, CabinClass, NewBooking};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangeClassRequest {
    pub class: CabinClass,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/class", put(change_class))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route("/bookings/{id}/check-in", post(check_in))
        .route("/passengers/{id}/bookings", get(passenger_bookings))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::ValidationError(e.body_text()))
}

async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.bookings.create(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn get_booking(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get(id).await?))
}

async fn passenger_bookings(
    State(state): State<AppState>,
    Path(passenger_id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_by_passenger(passenger_id).await?))
}

async fn change_class(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ChangeClassRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let req = body(payload)?;
    Ok(Json(state.bookings.change_class(id, req.class).await?))
}

async fn cancel_booking(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.cancel(id).await?))
}

async fn check_in(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.check_in(id).await?))
}
