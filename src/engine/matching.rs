use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::haversine_m;
use crate::models::driver::{GeoPoint, OnlineStatus, RidingStatus};
use crate::models::ride::{PaymentMethod, PaymentStatus, Ride, RideStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct RideRequest {
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
    pub fare: Option<f64>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateDriver {
    pub driver_id: Uuid,
    pub distance_m: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub ride: Ride,
    pub candidates: Vec<CandidateDriver>,
}

/// Binds an incoming ride request to the nearest available driver.
///
/// The matched driver is not reserved here; occupancy is only claimed at
/// accept time, so the same driver can be the target of several REQUESTED
/// rides until one of them is accepted.
pub fn request_ride(
    state: &AppState,
    rider_id: Uuid,
    req: RideRequest,
) -> Result<MatchOutcome, AppError> {
    if req.fare.is_some_and(|fare| fare < 0.0) {
        return Err(AppError::BadRequest("fare must not be negative".to_string()));
    }

    if state.rider_has_active_ride(rider_id) {
        return Err(AppError::Conflict(
            "you already have an ongoing ride".to_string(),
        ));
    }

    let available = state.drivers.iter().filter_map(|entry| {
        let driver = entry.value();
        let is_available = driver.online_status == OnlineStatus::Active
            && driver.riding_status == RidingStatus::Idle;

        match (is_available, driver.location) {
            (true, Some(position)) => Some((driver.id, position)),
            _ => None,
        }
    });

    let (candidates, best) = scan_candidates(&req.pickup, state.search_radius_m, available);

    let Some((driver_id, distance_m)) = best else {
        state
            .metrics
            .matches_total
            .with_label_values(&["no_driver"])
            .inc();
        return Err(AppError::NoNearbyDrivers);
    };

    let ride = Ride {
        id: Uuid::new_v4(),
        rider_id,
        driver_id: Some(driver_id),
        pickup: req.pickup,
        destination: req.destination,
        status: RideStatus::Requested,
        fare: req.fare.unwrap_or(0.0),
        payment_method: req.payment_method,
        payment_status: PaymentStatus::Pending,
        requested_at: Utc::now(),
        accepted_at: None,
        completed_at: None,
        cancelled_at: None,
        rider_feedback: None,
        driver_feedback: None,
    };

    state.rides.insert(ride.id, ride.clone());

    state
        .metrics
        .matches_total
        .with_label_values(&["matched"])
        .inc();
    state.metrics.match_distance_meters.observe(distance_m);
    state.metrics.active_rides.inc();

    info!(
        ride_id = %ride.id,
        rider_id = %rider_id,
        driver_id = %driver_id,
        distance_m,
        candidates = candidates.len(),
        "ride requested and driver matched"
    );

    Ok(MatchOutcome { ride, candidates })
}

/// Evaluates every located candidate and keeps the nearest one inside the
/// radius. Ties go to the first candidate encountered.
fn scan_candidates(
    pickup: &GeoPoint,
    radius_m: f64,
    drivers: impl IntoIterator<Item = (Uuid, GeoPoint)>,
) -> (Vec<CandidateDriver>, Option<(Uuid, f64)>) {
    let mut candidates = Vec::new();
    let mut best: Option<(Uuid, f64)> = None;

    for (driver_id, position) in drivers {
        let distance_m = haversine_m(pickup, &position);
        candidates.push(CandidateDriver {
            driver_id,
            distance_m,
        });

        // strict `<` keeps the earlier of two equidistant candidates
        if distance_m <= radius_m && best.is_none_or(|(_, nearest)| distance_m < nearest) {
            best = Some((driver_id, distance_m));
        }
    }

    (candidates, best)
}
