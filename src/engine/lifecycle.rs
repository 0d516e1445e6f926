use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::{ApprovalStatus, RidingStatus};
use crate::models::principal::{Principal, Role};
use crate::models::ride::{PaymentStatus, Ride, RideStatus};
use crate::state::AppState;

// Multi-record transitions always lock the ride entry before the driver
// entry, so concurrent calls on the same ride serialize on the ride lock and
// there is no lock-order inversion with driver self-service updates.

pub fn accept_ride(state: &AppState, driver_user: Uuid, ride_id: Uuid) -> Result<Ride, AppError> {
    let profile_id = own_driver_profile(state, driver_user)?;

    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    // re-checked under the entry lock: of two concurrent accepts, the loser
    // observes the status flip and fails here
    if ride.status != RideStatus::Requested {
        return Err(AppError::Conflict(
            "ride already accepted or no longer available".to_string(),
        ));
    }

    if let Some(bound) = ride.driver_id {
        if bound != profile_id {
            return Err(AppError::Forbidden(
                "ride is assigned to another driver".to_string(),
            ));
        }
    }

    let mut driver = state
        .drivers
        .get_mut(&profile_id)
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))?;

    if driver.approval != ApprovalStatus::Approved {
        return Err(AppError::Forbidden("driver is not approved".to_string()));
    }
    if driver.on_ride {
        return Err(AppError::Conflict(
            "driver is already on another ride".to_string(),
        ));
    }

    ride.driver_id = Some(profile_id);
    ride.status = RideStatus::Accepted;
    ride.accepted_at = Some(Utc::now());

    driver.on_ride = true;
    driver.riding_status = RidingStatus::WaitingForPickup;
    driver.updated_at = Utc::now();

    record_transition(state, "accept");
    info!(ride_id = %ride.id, driver_id = %profile_id, "ride accepted");

    Ok(ride.clone())
}

pub fn reject_ride(state: &AppState, driver_user: Uuid, ride_id: Uuid) -> Result<Ride, AppError> {
    let profile_id = own_driver_profile(state, driver_user)?;

    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if ride.driver_id != Some(profile_id) {
        return Err(AppError::Forbidden(
            "you are not assigned to this ride".to_string(),
        ));
    }
    if ride.status != RideStatus::Requested {
        return Err(AppError::Conflict(
            "only a requested ride can be rejected".to_string(),
        ));
    }

    ride.status = RideStatus::Rejected;

    record_transition(state, "reject");
    state.metrics.active_rides.dec();
    info!(ride_id = %ride.id, driver_id = %profile_id, "ride rejected");

    Ok(ride.clone())
}

pub fn pick_up_ride(state: &AppState, driver_user: Uuid, ride_id: Uuid) -> Result<Ride, AppError> {
    let profile_id = own_driver_profile(state, driver_user)?;

    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if ride.driver_id != Some(profile_id) {
        return Err(AppError::Forbidden(
            "you are not assigned to this ride".to_string(),
        ));
    }
    if ride.status != RideStatus::Accepted {
        return Err(AppError::BadRequest(
            "ride must be accepted before pickup".to_string(),
        ));
    }

    ride.status = RideStatus::PickedUp;

    record_transition(state, "pickup");
    info!(ride_id = %ride.id, driver_id = %profile_id, "rider picked up");

    Ok(ride.clone())
}

pub fn mark_in_transit(
    state: &AppState,
    driver_user: Uuid,
    ride_id: Uuid,
) -> Result<Ride, AppError> {
    let profile_id = own_driver_profile(state, driver_user)?;

    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if ride.driver_id != Some(profile_id) {
        return Err(AppError::Forbidden(
            "you are not assigned to this ride".to_string(),
        ));
    }
    if ride.status != RideStatus::PickedUp {
        return Err(AppError::BadRequest(
            "ride must be picked up before transit".to_string(),
        ));
    }

    ride.status = RideStatus::InTransit;

    record_transition(state, "transit");
    info!(ride_id = %ride.id, driver_id = %profile_id, "ride in transit");

    Ok(ride.clone())
}

pub fn complete_ride(
    state: &AppState,
    driver_user: Uuid,
    ride_id: Uuid,
) -> Result<Ride, AppError> {
    let profile_id = own_driver_profile(state, driver_user)?;

    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if ride.driver_id != Some(profile_id) {
        return Err(AppError::Forbidden(
            "you are not assigned to this ride".to_string(),
        ));
    }
    if ride.status != RideStatus::InTransit {
        return Err(AppError::BadRequest(
            "ride must be in transit to complete".to_string(),
        ));
    }

    ride.status = RideStatus::Completed;
    ride.completed_at = Some(Utc::now());
    ride.payment_status = if ride.fare > 0.0 {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Failed
    };

    // settlement happens while the ride lock is still held, so earnings
    // accrue exactly once per completed ride
    if let Some(mut driver) = state.drivers.get_mut(&profile_id) {
        driver.on_ride = false;
        driver.riding_status = RidingStatus::Idle;
        driver.total_earning += ride.fare;
        driver.updated_at = Utc::now();
    }

    record_transition(state, "complete");
    state.metrics.active_rides.dec();
    info!(
        ride_id = %ride.id,
        driver_id = %profile_id,
        fare = ride.fare,
        "ride completed"
    );

    Ok(ride.clone())
}

pub fn cancel_ride(
    state: &AppState,
    principal: Principal,
    ride_id: Uuid,
) -> Result<Ride, AppError> {
    let driver_profile = match principal.role {
        Role::Driver => Some(own_driver_profile(state, principal.user_id)?),
        _ => None,
    };

    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    match principal.role {
        Role::Rider => {
            if ride.rider_id != principal.user_id {
                return Err(AppError::Forbidden(
                    "you can only cancel your own rides".to_string(),
                ));
            }
        }
        Role::Driver => {
            if ride.driver_id != driver_profile {
                return Err(AppError::Forbidden(
                    "you are not assigned to this ride".to_string(),
                ));
            }
        }
        Role::Admin => {
            return Err(AppError::Forbidden(
                "admins set ride status directly".to_string(),
            ));
        }
    }

    if !matches!(ride.status, RideStatus::Requested | RideStatus::Accepted) {
        return Err(AppError::BadRequest(
            "ride can only be cancelled before pickup".to_string(),
        ));
    }

    let was_accepted = ride.status == RideStatus::Accepted;
    ride.status = RideStatus::Cancelled;
    ride.cancelled_at = Some(Utc::now());

    // once accepted, the driver was claimed by this ride and must be freed
    if was_accepted {
        if let Some(driver_id) = ride.driver_id {
            release_driver(state, driver_id);
        }
    }

    record_transition(state, "cancel");
    state.metrics.active_rides.dec();
    info!(ride_id = %ride.id, user_id = %principal.user_id, "ride cancelled");

    Ok(ride.clone())
}

/// Administrative direct status set. Keeps timestamp bookkeeping consistent
/// with the regular transitions and frees the driver when forced into a
/// terminal state.
pub fn update_ride_status(
    state: &AppState,
    ride_id: Uuid,
    new_status: RideStatus,
) -> Result<Ride, AppError> {
    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    let prior = ride.status;
    ride.status = new_status;

    let now = Utc::now();
    match new_status {
        RideStatus::Accepted if ride.accepted_at.is_none() => ride.accepted_at = Some(now),
        RideStatus::Completed if ride.completed_at.is_none() => ride.completed_at = Some(now),
        RideStatus::Cancelled if ride.cancelled_at.is_none() => ride.cancelled_at = Some(now),
        _ => {}
    }

    if new_status.is_terminal() && prior.is_active() {
        if let Some(driver_id) = ride.driver_id {
            release_driver(state, driver_id);
        }
        state.metrics.active_rides.dec();
    } else if new_status.is_active() && prior.is_terminal() {
        state.metrics.active_rides.inc();
    }

    record_transition(state, "admin_set");
    info!(ride_id = %ride.id, ?prior, status = ?new_status, "ride status set by admin");

    Ok(ride.clone())
}

fn own_driver_profile(state: &AppState, user_id: Uuid) -> Result<Uuid, AppError> {
    state
        .driver_id_for_user(user_id)
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))
}

fn release_driver(state: &AppState, driver_id: Uuid) {
    if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
        driver.on_ride = false;
        driver.riding_status = RidingStatus::Idle;
        driver.updated_at = Utc::now();
    }
}

fn record_transition(state: &AppState, action: &str) {
    state
        .metrics
        .ride_transitions_total
        .with_label_values(&[action])
        .inc();
}
