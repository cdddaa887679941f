use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SeatLabel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub venue: String,
    pub price: f64,
    pub rows: u32,
    pub seats_per_row: u32,
    pub event_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn total_seats(&self) -> u32 {
        self.rows * self.seats_per_row
    }

    pub fn contains(&self, seat: &SeatLabel) -> bool {
        seat.in_grid(self.rows, self.seats_per_row)
    }

    /// Every seat of the grid, in label order.
    pub fn all_seats(&self) -> impl Iterator<Item = SeatLabel> + '_ {
        (0..self.rows).flat_map(|row| (1..=self.seats_per_row).map(move |n| SeatLabel::new(row, n)))
    }
}

// Геометрия и цена приходят от внешнего event-management сервиса
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub price: f64,
    pub rows: u32,
    pub seats_per_row: u32,
    pub event_date: Option<DateTime<Utc>>,
}
