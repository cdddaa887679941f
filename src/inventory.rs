//! Committed seat truth: which seats of an event are booked.
//!
//! The state is an arena of per-seat cells keyed by `(event_id, seat)`,
//! each behind its own mutex, so unrelated seats never contend. The only
//! multi-seat mutation, [`SeatInventory::mark_booked`], takes the cell locks
//! in seat-label order and flips all flags or none of them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::error::ReservationError;
use crate::models::SeatLabel;

type SeatKey = (i64, SeatLabel);
type Cell = Arc<Mutex<bool>>;

#[derive(Default)]
pub struct SeatInventory {
    cells: RwLock<HashMap<SeatKey, Cell>>,
}

impl SeatInventory {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &SeatKey) -> Option<Cell> {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn cell_or_insert(&self, key: SeatKey) -> Cell {
        if let Some(cell) = self.cell(&key) {
            return cell;
        }
        self.cells
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }

    pub fn is_booked(&self, event_id: i64, seat: &SeatLabel) -> bool {
        match self.cell(&(event_id, seat.clone())) {
            Some(cell) => *cell.lock().unwrap_or_else(PoisonError::into_inner),
            None => false,
        }
    }

    /// Books the whole set atomically. If any seat is already booked, every
    /// seat is left untouched and the error names all offenders.
    ///
    /// Cell locks are acquired in label order, the one global ordering, so
    /// overlapping commits cannot deadlock.
    pub fn mark_booked(&self, event_id: i64, seats: &[SeatLabel]) -> Result<(), ReservationError> {
        let mut labels = seats.to_vec();
        labels.sort();
        labels.dedup();

        let cells: Vec<Cell> = labels
            .iter()
            .map(|seat| self.cell_or_insert((event_id, seat.clone())))
            .collect();
        let mut guards: Vec<MutexGuard<'_, bool>> = cells
            .iter()
            .map(|cell| cell.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();

        let mut taken = Vec::new();
        for (seat, booked) in labels.iter().zip(guards.iter()) {
            if **booked {
                taken.push(seat.clone());
            }
        }
        if !taken.is_empty() {
            return Err(ReservationError::AlreadyBooked(taken));
        }

        for booked in guards.iter_mut() {
            **booked = true;
        }
        Ok(())
    }

    /// Frees seats after a cancellation. Idempotent: freeing an already-free
    /// (or never-booked) seat is a no-op.
    pub fn release(&self, event_id: i64, seats: &[SeatLabel]) {
        for seat in seats {
            if let Some(cell) = self.cell(&(event_id, seat.clone())) {
                *cell.lock().unwrap_or_else(PoisonError::into_inner) = false;
            }
        }
    }

    pub fn booked_seats(&self, event_id: i64) -> Vec<SeatLabel> {
        let snapshot: Vec<(SeatLabel, Cell)> = self
            .cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((eid, _), _)| *eid == event_id)
            .map(|((_, seat), cell)| (seat.clone(), cell.clone()))
            .collect();

        let mut booked: Vec<SeatLabel> = snapshot
            .into_iter()
            .filter(|(_, cell)| *cell.lock().unwrap_or_else(PoisonError::into_inner))
            .map(|(seat, _)| seat)
            .collect();
        booked.sort();
        booked
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn seats(labels: &[&str]) -> Vec<SeatLabel> {
        labels.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn books_a_set_once() {
        let inv = SeatInventory::new();
        inv.mark_booked(1, &seats(&["A1", "A2"])).unwrap();
        assert!(inv.is_booked(1, &"A1".parse().unwrap()));
        assert!(inv.is_booked(1, &"A2".parse().unwrap()));
        assert!(!inv.is_booked(1, &"A3".parse().unwrap()));
        assert!(!inv.is_booked(2, &"A1".parse().unwrap()));
    }

    #[test]
    fn failed_commit_changes_nothing() {
        let inv = SeatInventory::new();
        inv.mark_booked(1, &seats(&["B2"])).unwrap();

        let err = inv.mark_booked(1, &seats(&["B1", "B2", "B3"])).unwrap_err();
        assert_eq!(err, ReservationError::AlreadyBooked(seats(&["B2"])));

        // all-or-nothing: the free seats of the failed set stayed free
        assert!(!inv.is_booked(1, &"B1".parse().unwrap()));
        assert!(!inv.is_booked(1, &"B3".parse().unwrap()));
        assert_eq!(inv.booked_seats(1), seats(&["B2"]));
    }

    #[test]
    fn release_is_idempotent() {
        let inv = SeatInventory::new();
        inv.mark_booked(1, &seats(&["A1"])).unwrap();
        inv.release(1, &seats(&["A1"]));
        assert!(!inv.is_booked(1, &"A1".parse().unwrap()));
        inv.release(1, &seats(&["A1", "Z9"]));
        assert!(inv.booked_seats(1).is_empty());
    }

    #[test]
    fn concurrent_identical_commits_have_one_winner() {
        let inv = Arc::new(SeatInventory::new());
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let inv = inv.clone();
                let wins = wins.clone();
                thread::spawn(move || {
                    if inv.mark_booked(1, &seats(&["C1", "C2", "C3"])).is_ok() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(inv.booked_seats(1), seats(&["C1", "C2", "C3"]));
    }

    #[test]
    fn overlapping_commits_never_double_book() {
        // sets overlap on B5; reversed orderings would deadlock without the
        // sorted lock acquisition
        let inv = Arc::new(SeatInventory::new());
        let first = seats(&["B1", "B5"]);
        let second = seats(&["B5", "A1"]);

        let h1 = {
            let inv = inv.clone();
            let set = first.clone();
            thread::spawn(move || inv.mark_booked(1, &set).is_ok())
        };
        let h2 = {
            let inv = inv.clone();
            let set = second.clone();
            thread::spawn(move || inv.mark_booked(1, &set).is_ok())
        };
        let (ok1, ok2) = (h1.join().unwrap(), h2.join().unwrap());

        // B5 can only have gone to one of them
        assert!(ok1 ^ ok2);
        let booked = inv.booked_seats(1);
        if ok1 {
            assert_eq!(booked, first);
        } else {
            let mut expected = second.clone();
            expected.sort();
            assert_eq!(booked, expected);
        }
    }

    #[test]
    fn remove_event_drops_all_cells() {
        let inv = SeatInventory::new();
        inv.mark_booked(1, &seats(&["A1"])).unwrap();
        inv.mark_booked(2, &seats(&["A1"])).unwrap();
        inv.remove_event(1);
        assert!(inv.booked_seats(1).is_empty());
        assert_eq!(inv.booked_seats(2), seats(&["A1"]));
    }
}
