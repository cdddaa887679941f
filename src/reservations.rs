//! The reservation state machine: ties the hold manager and the seat
//! inventory together so that, per seat, the only observable transitions are
//! `Free -> Held -> Booked`, `Held -> Free` (release or expiry) and
//! `Held -> Held(other)` strictly after the prior hold lapsed. A live hold
//! is never stolen; expiry is the only way a held seat cycles back.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ReservationError;
use crate::holds::HoldManager;
use crate::inventory::SeatInventory;
use crate::models::{Booking, BookingStatus, Event, HoldToken, NewEvent, SeatLabel};

/// Outcome of a seat selection: per-seat grants and denials. Deliberately
/// not all-or-nothing: in a live seat map the caller wants to keep the
/// seats it did win and see exactly which ones it lost.
#[derive(Debug, Serialize)]
pub struct Selection {
    pub granted: Vec<GrantedSeat>,
    pub denied: Vec<DeniedSeat>,
}

#[derive(Debug, Serialize)]
pub struct GrantedSeat {
    pub seat: SeatLabel,
    pub token: HoldToken,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DeniedSeat {
    pub seat: String,
    pub reason: DenyReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Booked, or actively held by another holder.
    Unavailable,
    /// Label does not exist in the event's grid.
    UnknownSeat,
}

/// Point-in-time availability projection for rendering a seat map.
/// Held seats are computed by filtering expired holds at read time, so the
/// view never depends on the background sweep having run.
#[derive(Debug, Serialize)]
pub struct SeatMap {
    pub event_id: i64,
    pub rows: u32,
    pub seats_per_row: u32,
    pub price: f64,
    pub free: Vec<SeatLabel>,
    pub held: Vec<SeatLabel>,
    pub booked: Vec<SeatLabel>,
}

pub struct ReservationCoordinator {
    events: RwLock<HashMap<i64, Event>>,
    bookings: RwLock<HashMap<i64, Booking>>,
    inventory: SeatInventory,
    holds: HoldManager,
    next_event_id: AtomicI64,
    next_booking_id: AtomicI64,
    hold_ttl: Duration,
}

impl ReservationCoordinator {
    pub fn new(hold_ttl: Duration) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            bookings: RwLock::new(HashMap::new()),
            inventory: SeatInventory::new(),
            holds: HoldManager::new(),
            next_event_id: AtomicI64::new(1),
            next_booking_id: AtomicI64::new(1),
            hold_ttl,
        }
    }

    pub fn hold_ttl(&self) -> Duration {
        self.hold_ttl
    }

    /* ---------- events ---------- */

    /// Registers an event supplied by the external event-management
    /// collaborator. Geometry is immutable afterwards.
    pub fn register_event(&self, new: NewEvent) -> Result<Event, ReservationError> {
        if new.title.trim().is_empty() {
            return Err(ReservationError::InvalidRequest(
                "title must not be empty".to_string(),
            ));
        }
        if new.rows == 0 || new.seats_per_row == 0 {
            return Err(ReservationError::InvalidRequest(
                "rows and seats_per_row must be >= 1".to_string(),
            ));
        }
        if !new.price.is_finite() || new.price < 0.0 {
            return Err(ReservationError::InvalidRequest(
                "price must be >= 0".to_string(),
            ));
        }

        let event = Event {
            id: self.next_event_id.fetch_add(1, Ordering::Relaxed),
            title: new.title,
            description: new.description,
            venue: new.venue.unwrap_or_else(|| "Main Hall".to_string()),
            price: new.price,
            rows: new.rows,
            seats_per_row: new.seats_per_row,
            event_date: new.event_date,
            created_at: Utc::now(),
        };
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event.id, event.clone());
        info!(
            event_id = event.id,
            seats = event.total_seats(),
            "event registered: {}",
            event.title
        );
        Ok(event)
    }

    pub fn get_event(&self, event_id: i64) -> Result<Event, ReservationError> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event_id)
            .cloned()
            .ok_or_else(|| ReservationError::NotFound(format!("event {event_id}")))
    }

    pub fn list_events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        events.sort_by_key(|e| e.id);
        events
    }

    /// Removes an event and everything attached to it: seat cells, holds,
    /// bookings. Individual seats are never deleted on their own.
    pub fn remove_event(&self, event_id: i64) -> Result<(), ReservationError> {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&event_id)
            .ok_or_else(|| ReservationError::NotFound(format!("event {event_id}")))?;
        self.holds.remove_event(event_id);
        self.inventory.remove_event(event_id);
        self.bookings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, b| b.event_id != event_id);
        info!(event_id, "event removed");
        Ok(())
    }

    /* ---------- selection ---------- */

    /// Attempts a hold on each requested seat independently. Every seat of
    /// the request comes back exactly once, granted or denied. Partial
    /// grants are intentional: one contested seat must not sink the other
    /// nine.
    pub fn select_seats(
        &self,
        event_id: i64,
        holder: &str,
        seats: &[String],
    ) -> Result<Selection, ReservationError> {
        let event = self.get_event(event_id)?;
        let mut granted = Vec::new();
        let mut denied = Vec::new();
        let mut seen = HashSet::new();

        for raw in seats {
            let parsed = raw
                .parse::<SeatLabel>()
                .ok()
                .filter(|seat| event.contains(seat));
            let key = parsed
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| raw.trim().to_uppercase());
            if !seen.insert(key) {
                continue;
            }

            let Some(seat) = parsed else {
                denied.push(DeniedSeat {
                    seat: raw.clone(),
                    reason: DenyReason::UnknownSeat,
                });
                continue;
            };

            if self.inventory.is_booked(event_id, &seat) {
                denied.push(DeniedSeat {
                    seat: seat.to_string(),
                    reason: DenyReason::Unavailable,
                });
                continue;
            }

            match self.holds.try_hold(event_id, &seat, holder, self.hold_ttl) {
                Ok((token, expires_at)) => granted.push(GrantedSeat {
                    seat,
                    token,
                    expires_at,
                }),
                Err(_) => denied.push(DeniedSeat {
                    seat: seat.to_string(),
                    reason: DenyReason::Unavailable,
                }),
            }
        }

        debug!(
            event_id,
            holder,
            granted = granted.len(),
            denied = denied.len(),
            "seat selection"
        );
        Ok(Selection { granted, denied })
    }

    /// Refreshes the expiry of a live hold so a buyer can keep thinking.
    pub fn extend_hold(&self, token: &HoldToken) -> Result<DateTime<Utc>, ReservationError> {
        self.holds.extend(token, self.hold_ttl)
    }

    /// Releases the caller's holds on the given seats. Idempotent; seats the
    /// caller does not hold (or that do not exist) are simply skipped.
    pub fn release_seats(
        &self,
        event_id: i64,
        holder: &str,
        seats: &[String],
    ) -> Result<(), ReservationError> {
        self.get_event(event_id)?;
        for raw in seats {
            if let Ok(seat) = raw.parse::<SeatLabel>() {
                self.holds.release_owned(event_id, &seat, holder);
            }
        }
        Ok(())
    }

    /* ---------- booking ---------- */

    /// All-or-nothing commit of the holder's selection.
    ///
    /// Preconditions: `holder` owns a live hold on every requested seat,
    /// else `HoldExpired` names the lapsed ones and nothing changes. The
    /// inventory commit can still lose a race if a hold was somehow bypassed;
    /// then `AlreadyBooked` comes back and the holder keeps every hold it
    /// still has, so a retry after a seat-map refresh is cheap.
    pub fn confirm_booking(
        &self,
        event_id: i64,
        holder: &str,
        seats: &[String],
    ) -> Result<Booking, ReservationError> {
        let event = self.get_event(event_id)?;
        if seats.is_empty() {
            return Err(ReservationError::InvalidRequest(
                "no seats requested".to_string(),
            ));
        }

        let mut labels = Vec::new();
        let mut unknown = Vec::new();
        for raw in seats {
            match raw.parse::<SeatLabel>() {
                Ok(seat) if event.contains(&seat) => labels.push(seat),
                _ => unknown.push(raw.clone()),
            }
        }
        if !unknown.is_empty() {
            return Err(ReservationError::NotFound(format!(
                "seat(s) {}",
                unknown.join(", ")
            )));
        }
        labels.sort();
        labels.dedup();

        let lapsed: Vec<SeatLabel> = labels
            .iter()
            .filter(|seat| {
                !self
                    .holds
                    .active_hold(event_id, seat)
                    .is_some_and(|h| h.holder == holder)
            })
            .cloned()
            .collect();
        if !lapsed.is_empty() {
            return Err(ReservationError::HoldExpired(lapsed));
        }

        // holds stay untouched on failure so the caller can retry
        self.inventory.mark_booked(event_id, &labels)?;

        let booking = Booking {
            id: self.next_booking_id.fetch_add(1, Ordering::Relaxed),
            event_id,
            holder: holder.to_string(),
            seats: labels.clone(),
            total_price: event.price * labels.len() as f64,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        };
        for seat in &labels {
            self.holds.release_owned(event_id, seat, holder);
        }
        self.bookings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(booking.id, booking.clone());

        info!(
            booking_id = booking.id,
            event_id,
            holder,
            seats = booking.seats.len(),
            "booking confirmed"
        );
        Ok(booking)
    }

    /// Reverts a booking's seats to free. A second cancel is a no-op.
    pub fn cancel_booking(&self, booking_id: i64) -> Result<(), ReservationError> {
        let mut bookings = self.bookings.write().unwrap_or_else(PoisonError::into_inner);
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or_else(|| ReservationError::NotFound(format!("booking {booking_id}")))?;
        if booking.status == BookingStatus::Cancelled {
            return Ok(());
        }
        self.inventory.release(booking.event_id, &booking.seats);
        booking.status = BookingStatus::Cancelled;
        info!(booking_id, event_id = booking.event_id, "booking cancelled");
        Ok(())
    }

    pub fn bookings_for_holder(&self, holder: &str) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|b| b.holder == holder)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        bookings
    }

    /* ---------- query facade ---------- */

    pub fn seat_map(&self, event_id: i64) -> Result<SeatMap, ReservationError> {
        let event = self.get_event(event_id)?;
        let booked: BTreeSet<SeatLabel> = self.inventory.booked_seats(event_id).into_iter().collect();
        // a booked seat wins over any leftover hold on it
        let held: BTreeSet<SeatLabel> = self
            .holds
            .active_holds(event_id)
            .into_iter()
            .map(|(seat, _)| seat)
            .filter(|seat| !booked.contains(seat))
            .collect();
        let free: Vec<SeatLabel> = event
            .all_seats()
            .filter(|seat| !booked.contains(seat) && !held.contains(seat))
            .collect();

        Ok(SeatMap {
            event_id,
            rows: event.rows,
            seats_per_row: event.seats_per_row,
            price: event.price,
            free,
            held: held.into_iter().collect(),
            booked: booked.into_iter().collect(),
        })
    }

    /* ---------- maintenance ---------- */

    /// Reclaims lapsed holds. Purely housekeeping: every validity check
    /// already applies expiry lazily.
    pub fn sweep_expired(&self) -> usize {
        self.holds.sweep_expired()
    }
}
