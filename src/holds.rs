//! Short-lived per-seat soft locks ("holds") with TTL expiry.
//!
//! Same arena shape as the inventory: one independently lockable slot per
//! `(event_id, seat)`. Expiry is lazy: every read re-evaluates
//! `expires_at`, so a lapsed hold is invisible the instant it lapses,
//! whether or not [`HoldManager::sweep_expired`] has run. The sweep only
//! reclaims memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::ReservationError;
use crate::models::{HoldToken, SeatHold, SeatLabel};

type SeatKey = (i64, SeatLabel);
type Slot = Arc<Mutex<Option<SeatHold>>>;

#[derive(Default)]
pub struct HoldManager {
    cells: RwLock<HashMap<SeatKey, Slot>>,
}

impl HoldManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &SeatKey) -> Option<Slot> {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn slot_or_insert(&self, key: SeatKey) -> Slot {
        if let Some(slot) = self.slot(&key) {
            return slot;
        }
        self.cells
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }

    /// First-come-first-served hold acquisition, atomic per seat: of N
    /// concurrent callers exactly one wins. An expired hold counts as
    /// absent. If `holder` already owns the live hold, it is refreshed in
    /// place and the original token returned (a buyer re-selecting its own
    /// seat must not lose it).
    pub fn try_hold(
        &self,
        event_id: i64,
        seat: &SeatLabel,
        holder: &str,
        ttl: Duration,
    ) -> Result<(HoldToken, DateTime<Utc>), ReservationError> {
        let slot = self.slot_or_insert((event_id, seat.clone()));
        let mut hold = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();

        if let Some(existing) = hold.as_mut() {
            if !existing.is_expired(now) {
                if existing.holder != holder {
                    return Err(ReservationError::SeatUnavailable(vec![seat.clone()]));
                }
                existing.expires_at = now + ttl;
                let token = HoldToken {
                    event_id,
                    seat: seat.clone(),
                    id: existing.id,
                };
                return Ok((token, existing.expires_at));
            }
        }

        let fresh = SeatHold {
            id: Uuid::new_v4(),
            holder: holder.to_string(),
            expires_at: now + ttl,
        };
        let token = HoldToken {
            event_id,
            seat: seat.clone(),
            id: fresh.id,
        };
        let expires_at = fresh.expires_at;
        *hold = Some(fresh);
        Ok((token, expires_at))
    }

    /// Refreshes the expiry of a live hold. Fails if the hold lapsed or was
    /// taken over since the token was issued.
    pub fn extend(
        &self,
        token: &HoldToken,
        ttl: Duration,
    ) -> Result<DateTime<Utc>, ReservationError> {
        let expired = || ReservationError::HoldExpired(vec![token.seat.clone()]);
        let slot = self
            .slot(&(token.event_id, token.seat.clone()))
            .ok_or_else(expired)?;
        let mut hold = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();

        match hold.as_mut() {
            Some(h) if h.id == token.id && !h.is_expired(now) => {
                h.expires_at = now + ttl;
                Ok(h.expires_at)
            }
            _ => Err(expired()),
        }
    }

    /// Releases the hold the token refers to. Idempotent: an expired,
    /// already-released or foreign token is a no-op, so client retries are
    /// harmless.
    pub fn release(&self, token: &HoldToken) {
        if let Some(slot) = self.slot(&(token.event_id, token.seat.clone())) {
            let mut hold = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if hold.as_ref().is_some_and(|h| h.id == token.id) {
                *hold = None;
            }
        }
    }

    /// Releases a seat's hold by holder identity. Same idempotency as
    /// [`HoldManager::release`].
    pub fn release_owned(&self, event_id: i64, seat: &SeatLabel, holder: &str) {
        if let Some(slot) = self.slot(&(event_id, seat.clone())) {
            let mut hold = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if hold.as_ref().is_some_and(|h| h.holder == holder) {
                *hold = None;
            }
        }
    }

    /// The live hold on a seat, if any (lazy expiry applied).
    pub fn active_hold(&self, event_id: i64, seat: &SeatLabel) -> Option<SeatHold> {
        let slot = self.slot(&(event_id, seat.clone()))?;
        let hold = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        hold.as_ref().filter(|h| !h.is_expired(now)).cloned()
    }

    /// All live holds of an event, in seat order.
    pub fn active_holds(&self, event_id: i64) -> Vec<(SeatLabel, SeatHold)> {
        let snapshot: Vec<(SeatLabel, Slot)> = self
            .cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((eid, _), _)| *eid == event_id)
            .map(|((_, seat), slot)| (seat.clone(), slot.clone()))
            .collect();

        let now = Utc::now();
        let mut live: Vec<(SeatLabel, SeatHold)> = snapshot
            .into_iter()
            .filter_map(|(seat, slot)| {
                let hold = slot.lock().unwrap_or_else(PoisonError::into_inner);
                hold.as_ref()
                    .filter(|h| !h.is_expired(now))
                    .cloned()
                    .map(|h| (seat, h))
            })
            .collect();
        live.sort_by(|a, b| a.0.cmp(&b.0));
        live
    }

    /// Clears lapsed holds, returning how many were reclaimed. Slots are
    /// cleared in place, never removed from the map: a caller that already
    /// cloned a slot handle must keep racing against the same lock, not a
    /// detached one.
    pub fn sweep_expired(&self) -> usize {
        let snapshot: Vec<Slot> = self
            .cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let now = Utc::now();
        let mut cleared = 0;
        for slot in snapshot {
            let mut hold = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if hold.as_ref().is_some_and(|h| h.is_expired(now)) {
                *hold = None;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn remove_event(&self, event_id: i64) {
        self.cells
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(eid, _), _| *eid != event_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;
    use std::time::Duration as StdDuration;

    fn seat(label: &str) -> SeatLabel {
        label.parse().unwrap()
    }

    fn ttl_secs(s: i64) -> Duration {
        Duration::seconds(s)
    }

    #[test]
    fn second_holder_is_rejected_while_hold_is_live() {
        let holds = HoldManager::new();
        holds.try_hold(1, &seat("A1"), "alice", ttl_secs(60)).unwrap();

        let err = holds
            .try_hold(1, &seat("A1"), "bob", ttl_secs(60))
            .unwrap_err();
        assert_eq!(err, ReservationError::SeatUnavailable(vec![seat("A1")]));

        // other seats and other events stay independent
        holds.try_hold(1, &seat("A2"), "bob", ttl_secs(60)).unwrap();
        holds.try_hold(2, &seat("A1"), "bob", ttl_secs(60)).unwrap();
    }

    #[test]
    fn same_holder_reselect_refreshes_and_keeps_token() {
        let holds = HoldManager::new();
        let (token, first_expiry) = holds.try_hold(1, &seat("A1"), "alice", ttl_secs(60)).unwrap();
        let (token2, second_expiry) =
            holds.try_hold(1, &seat("A1"), "alice", ttl_secs(120)).unwrap();
        assert_eq!(token, token2);
        assert!(second_expiry >= first_expiry);
    }

    #[test]
    fn expired_hold_never_blocks_a_new_one() {
        let holds = HoldManager::new();
        let (stale, _) = holds
            .try_hold(1, &seat("A1"), "alice", Duration::milliseconds(20))
            .unwrap();
        thread::sleep(StdDuration::from_millis(50));

        assert!(holds.active_hold(1, &seat("A1")).is_none());
        let (fresh, _) = holds.try_hold(1, &seat("A1"), "bob", ttl_secs(60)).unwrap();
        assert_ne!(stale.id, fresh.id);

        // the stale token lost all power over the seat
        assert!(holds.extend(&stale, ttl_secs(60)).is_err());
        holds.release(&stale);
        assert_eq!(holds.active_hold(1, &seat("A1")).unwrap().holder, "bob");
    }

    #[test]
    fn extend_refreshes_live_hold_only() {
        let holds = HoldManager::new();
        let (token, _) = holds
            .try_hold(1, &seat("B2"), "alice", Duration::milliseconds(30))
            .unwrap();
        holds.extend(&token, ttl_secs(60)).unwrap();

        thread::sleep(StdDuration::from_millis(5));
        assert!(holds.active_hold(1, &seat("B2")).is_some());

        let (lapsed, _) = holds
            .try_hold(1, &seat("B3"), "alice", Duration::milliseconds(10))
            .unwrap();
        thread::sleep(StdDuration::from_millis(40));
        let err = holds.extend(&lapsed, ttl_secs(60)).unwrap_err();
        assert_eq!(err, ReservationError::HoldExpired(vec![seat("B3")]));
    }

    #[test]
    fn release_is_idempotent() {
        let holds = HoldManager::new();
        let (token, _) = holds.try_hold(1, &seat("A1"), "alice", ttl_secs(60)).unwrap();
        holds.release(&token);
        assert!(holds.active_hold(1, &seat("A1")).is_none());
        holds.release(&token); // second release: no error, no state change
        assert!(holds.active_hold(1, &seat("A1")).is_none());
    }

    #[test]
    fn release_owned_ignores_other_holders() {
        let holds = HoldManager::new();
        holds.try_hold(1, &seat("A1"), "alice", ttl_secs(60)).unwrap();
        holds.release_owned(1, &seat("A1"), "bob");
        assert_eq!(holds.active_hold(1, &seat("A1")).unwrap().holder, "alice");
        holds.release_owned(1, &seat("A1"), "alice");
        assert!(holds.active_hold(1, &seat("A1")).is_none());
    }

    #[test]
    fn sweep_reclaims_only_lapsed_holds() {
        let holds = HoldManager::new();
        holds
            .try_hold(1, &seat("A1"), "alice", Duration::milliseconds(10))
            .unwrap();
        holds
            .try_hold(1, &seat("A2"), "bob", Duration::milliseconds(10))
            .unwrap();
        holds.try_hold(1, &seat("A3"), "carol", ttl_secs(60)).unwrap();

        thread::sleep(StdDuration::from_millis(40));
        assert_eq!(holds.sweep_expired(), 2);
        assert_eq!(holds.sweep_expired(), 0);
        assert_eq!(holds.active_holds(1).len(), 1);
    }

    #[test]
    fn n_threads_racing_one_seat_exactly_one_wins() {
        let holds = Arc::new(HoldManager::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let holds = holds.clone();
                thread::spawn(move || {
                    holds
                        .try_hold(1, &seat("D4"), &format!("holder-{i}"), ttl_secs(60))
                        .is_ok()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn mutual_exclusion_holds_for_any_contender_count(n in 2usize..24) {
            let holds = Arc::new(HoldManager::new());
            let handles: Vec<_> = (0..n)
                .map(|i| {
                    let holds = holds.clone();
                    thread::spawn(move || {
                        holds
                            .try_hold(9, &seat("A7"), &format!("h{i}"), Duration::seconds(30))
                            .is_ok()
                    })
                })
                .collect();
            let wins = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            prop_assert_eq!(wins, 1);
        }
    }
}
