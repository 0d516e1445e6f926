use dashmap::DashMap;
use uuid::Uuid;

use crate::models::driver::Driver;
use crate::models::ride::Ride;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub drivers: DashMap<Uuid, Driver>,
    pub rides: DashMap<Uuid, Ride>,
    pub search_radius_m: f64,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(search_radius_m: f64) -> Self {
        Self {
            drivers: DashMap::new(),
            rides: DashMap::new(),
            search_radius_m,
            metrics: Metrics::new(),
        }
    }

    /// One driver profile per user, so a scan by user id has at most one hit.
    pub fn driver_id_for_user(&self, user_id: Uuid) -> Option<Uuid> {
        self.drivers
            .iter()
            .find(|entry| entry.value().user_id == user_id)
            .map(|entry| *entry.key())
    }

    pub fn rider_has_active_ride(&self, rider_id: Uuid) -> bool {
        self.rides
            .iter()
            .any(|entry| entry.value().rider_id == rider_id && entry.value().status.is_active())
    }
}
