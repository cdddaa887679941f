use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SeatLabel;

/// Soft claim on a single seat, alive until `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatHold {
    pub id: Uuid,
    pub holder: String, // Could be email or session ID
    pub expires_at: DateTime<Utc>,
}

impl SeatHold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Opaque handle a client echoes back to extend or release its hold.
/// The `id` ties the token to one hold instance: after expiry and takeover
/// by another holder, the stale token stops matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldToken {
    pub event_id: i64,
    pub seat: SeatLabel,
    pub id: Uuid,
}
