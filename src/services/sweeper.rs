use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::AppState;

/// Фоновая очистка истёкших hold'ов.
///
/// Correctness never depends on this running: every hold check applies
/// expiry lazily. The sweep only reclaims the memory of lapsed holds.
pub struct SweeperService {
    state: Arc<AppState>,
}

impl SweeperService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Запускает бесконечный цикл очистки
    pub async fn run(self) {
        let interval = Duration::from_secs(self.state.config.hold.sweep_interval_seconds);
        info!("🧹 Hold sweeper running every {:?}", interval);
        loop {
            tokio::time::sleep(interval).await;
            self.sweep_once();
        }
    }

    /// Одна итерация очистки
    pub fn sweep_once(&self) {
        let reclaimed = self.state.reservations.sweep_expired();
        if reclaimed > 0 {
            info!("🧹 Reclaimed {} expired hold(s)", reclaimed);
        } else {
            debug!("No expired holds to reclaim");
        }
    }
}
