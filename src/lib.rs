pub mod config;
pub mod controllers;
pub mod error;
pub mod holds;
pub mod inventory;
pub mod models;
pub mod reservations;
pub mod services;

use std::sync::Arc;

use chrono::Duration;

use crate::reservations::ReservationCoordinator;

// Shared state для всего приложения
pub struct AppState {
    pub reservations: ReservationCoordinator,
    pub config: config::Config,
}

impl AppState {
    pub fn new(config: config::Config) -> Arc<Self> {
        let hold_ttl = Duration::seconds(config.hold.ttl_seconds as i64);
        Arc::new(Self {
            reservations: ReservationCoordinator::new(hold_ttl),
            config,
        })
    }
}
