use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::ReservationError;
use crate::models::NewEvent;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events", post(create_event))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}", delete(delete_event))
        .route("/events/{id}/seats", get(get_seat_map))
}

// GET /api/events
async fn list_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.reservations.list_events())
}

// POST /api/events - геометрия приходит от внешнего event-management сервиса
async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewEvent>,
) -> Result<impl IntoResponse, ReservationError> {
    let event = state.reservations.register_event(req)?;
    Ok((StatusCode::CREATED, Json(event)))
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ReservationError> {
    Ok(Json(state.reservations.get_event(id)?))
}

// DELETE /api/events/{id} - каскадно удаляет места, hold'ы и брони
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ReservationError> {
    state.reservations.remove_event(id)?;
    Ok(Json(json!({"message": "Event deleted successfully"})))
}

// GET /api/events/{id}/seats
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ReservationError> {
    Ok(Json(state.reservations.seat_map(id)?))
}
