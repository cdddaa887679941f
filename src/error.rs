//! Reservation error types with HTTP status code mapping.
//!
//! Everything here is recoverable by the caller: conflicts are normal race
//! outcomes in a live seat map, and retrying against a fresh seat map is the
//! expected client behavior.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::models::SeatLabel;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    /// Offending seats, for conflict-class errors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReservationError {
    /// Seat is booked or actively held by someone else.
    #[error("seat(s) unavailable: {}", seats_csv(.0))]
    SeatUnavailable(Vec<SeatLabel>),

    /// Caller's hold lapsed (or never existed) before confirm.
    #[error("hold expired for seat(s): {}", seats_csv(.0))]
    HoldExpired(Vec<SeatLabel>),

    /// Commit-time race lost: the seats got booked under a bypassed hold.
    #[error("seat(s) already booked: {}", seats_csv(.0))]
    AlreadyBooked(Vec<SeatLabel>),

    /// Unknown event / seat / booking.
    #[error("{0} not found")]
    NotFound(String),

    /// Request shape rejected before touching any seat state.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn seats_csv(seats: &[SeatLabel]) -> String {
    seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ReservationError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SeatUnavailable(_) => "SEAT_UNAVAILABLE",
            Self::HoldExpired(_) => "HOLD_EXPIRED",
            Self::AlreadyBooked(_) => "ALREADY_BOOKED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::SeatUnavailable(_) | Self::HoldExpired(_) | Self::AlreadyBooked(_) => {
                StatusCode::CONFLICT
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn seats(&self) -> Vec<String> {
        match self {
            Self::SeatUnavailable(seats) | Self::HoldExpired(seats) | Self::AlreadyBooked(seats) => {
                seats.iter().map(ToString::to_string).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for ReservationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
                seats: self.seats(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
