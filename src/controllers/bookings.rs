use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::ReservationError;
use crate::models::HoldToken;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seats/select", post(select_seats))
        .route("/seats/release", post(release_seats))
        .route("/holds/extend", post(extend_hold))
        .route("/bookings", get(get_holder_bookings))
        .route("/bookings/confirm", post(confirm_booking))
        .route("/bookings/cancel", patch(cancel_booking))
}

/* ---------- helpers ---------- */

fn check_seat_request(
    event_id: i64,
    holder_id: &str,
    seats: &[String],
) -> Result<(), ReservationError> {
    if event_id <= 0 {
        return Err(ReservationError::InvalidRequest(
            "event_id должен быть > 0".to_string(),
        ));
    }
    if holder_id.trim().is_empty() {
        return Err(ReservationError::InvalidRequest(
            "holder_id не должен быть пустым".to_string(),
        ));
    }
    if seats.is_empty() {
        return Err(ReservationError::InvalidRequest(
            "seats не должен быть пустым".to_string(),
        ));
    }
    Ok(())
}

/* ---------- SEATS ---------- */

// POST /api/seats/select
#[derive(Debug, Deserialize)]
struct SelectSeatsRequest {
    event_id: i64,
    holder_id: String,
    seats: Vec<String>,
}

async fn select_seats(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectSeatsRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    check_seat_request(req.event_id, &req.holder_id, &req.seats)?;

    let selection = state
        .reservations
        .select_seats(req.event_id, &req.holder_id, &req.seats)?;
    Ok(Json(selection))
}

// POST /api/seats/release
#[derive(Debug, Deserialize)]
struct ReleaseSeatsRequest {
    event_id: i64,
    holder_id: String,
    seats: Vec<String>,
}

async fn release_seats(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReleaseSeatsRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    check_seat_request(req.event_id, &req.holder_id, &req.seats)?;

    state
        .reservations
        .release_seats(req.event_id, &req.holder_id, &req.seats)?;
    Ok(Json(json!({"message": "Места успешно освобождены"})))
}

// POST /api/holds/extend
#[derive(Debug, Deserialize)]
struct ExtendHoldRequest {
    token: HoldToken,
}

async fn extend_hold(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtendHoldRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    let expires_at = state.reservations.extend_hold(&req.token)?;
    Ok(Json(json!({"expires_at": expires_at})))
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings/confirm
#[derive(Debug, Deserialize)]
struct ConfirmBookingRequest {
    event_id: i64,
    holder_id: String,
    seats: Vec<String>,
}

async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmBookingRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    check_seat_request(req.event_id, &req.holder_id, &req.seats)?;

    let booking = state
        .reservations
        .confirm_booking(req.event_id, &req.holder_id, &req.seats)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings?holder_id=...
#[derive(Debug, Deserialize)]
struct BookingsQuery {
    holder_id: String,
}

async fn get_holder_bookings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BookingsQuery>,
) -> Result<impl IntoResponse, ReservationError> {
    if params.holder_id.trim().is_empty() {
        return Err(ReservationError::InvalidRequest(
            "holder_id не должен быть пустым".to_string(),
        ));
    }
    Ok(Json(state.reservations.bookings_for_holder(&params.holder_id)))
}

// PATCH /api/bookings/cancel
#[derive(Debug, Deserialize)]
struct CancelBookingRequest {
    booking_id: i64,
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    if req.booking_id <= 0 {
        return Err(ReservationError::InvalidRequest(
            "booking_id должен быть > 0".to_string(),
        ));
    }

    state.reservations.cancel_booking(req.booking_id)?;
    Ok(Json(json!({"message": "Бронь успешно отменена"})))
}
