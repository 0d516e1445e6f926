use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::{
    ApprovalStatus, Driver, GeoPoint, OnlineStatus, RidingStatus, Vehicle,
};
use crate::models::principal::{Principal, Role};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverField {
    OnlineStatus,
    RidingStatus,
    Location,
    Approval,
}

/// Explicit per-role whitelist of mutable driver fields, consulted by the
/// update path instead of ad hoc role conditionals.
pub fn role_mutable_fields(role: Role) -> &'static [DriverField] {
    match role {
        Role::Rider => &[],
        Role::Driver => &[
            DriverField::OnlineStatus,
            DriverField::RidingStatus,
            DriverField::Location,
        ],
        Role::Admin => &[
            DriverField::OnlineStatus,
            DriverField::RidingStatus,
            DriverField::Location,
            DriverField::Approval,
        ],
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyDriverRequest {
    pub vehicle: Vehicle,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverUpdate {
    pub online_status: Option<OnlineStatus>,
    pub riding_status: Option<RidingStatus>,
    pub location: Option<GeoPoint>,
}

pub fn apply_as_driver(
    state: &AppState,
    user_id: Uuid,
    req: ApplyDriverRequest,
) -> Result<Driver, AppError> {
    if state.driver_id_for_user(user_id).is_some() {
        return Err(AppError::Conflict(
            "you have already applied as a driver".to_string(),
        ));
    }

    let driver = Driver::new(user_id, req.vehicle, req.location);
    state.drivers.insert(driver.id, driver.clone());

    info!(driver_id = %driver.id, user_id = %user_id, "driver application received");
    Ok(driver)
}

pub fn approve_driver(state: &AppState, driver_id: Uuid) -> Result<Driver, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound("driver not found".to_string()))?;

    if driver.approval == ApprovalStatus::Approved {
        return Err(AppError::Conflict("driver is already approved".to_string()));
    }

    driver.approval = ApprovalStatus::Approved;
    driver.updated_at = Utc::now();

    info!(driver_id = %driver.id, "driver approved");
    Ok(driver.clone())
}

pub fn suspend_driver(state: &AppState, driver_id: Uuid) -> Result<Driver, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound("driver not found".to_string()))?;

    if driver.approval == ApprovalStatus::Suspended {
        return Err(AppError::Conflict(
            "driver is already suspended".to_string(),
        ));
    }

    driver.approval = ApprovalStatus::Suspended;
    driver.updated_at = Utc::now();

    info!(driver_id = %driver.id, "driver suspended");
    Ok(driver.clone())
}

pub fn get_driver_profile(state: &AppState, user_id: Uuid) -> Result<Driver, AppError> {
    let profile_id = state
        .driver_id_for_user(user_id)
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))?;

    state
        .drivers
        .get(&profile_id)
        .map(|entry| entry.clone())
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))
}

pub fn list_drivers(state: &AppState) -> Vec<Driver> {
    state
        .drivers
        .iter()
        .map(|entry| entry.value().clone())
        .collect()
}

/// Self-service (and admin) driver record update. Every write goes through a
/// fresh read-modify-write of the live record under its entry lock; stale
/// snapshots are never written back.
pub fn update_driver_profile(
    state: &AppState,
    principal: Principal,
    driver_id: Uuid,
    update: DriverUpdate,
) -> Result<Driver, AppError> {
    let allowed = role_mutable_fields(principal.role);
    let requested = [
        (DriverField::OnlineStatus, update.online_status.is_some()),
        (DriverField::RidingStatus, update.riding_status.is_some()),
        (DriverField::Location, update.location.is_some()),
    ];
    for (field, present) in requested {
        if present && !allowed.contains(&field) {
            return Err(AppError::Forbidden(format!(
                "role {:?} may not update {:?}",
                principal.role, field
            )));
        }
    }

    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound("driver not found".to_string()))?;

    if principal.role == Role::Driver && driver.user_id != principal.user_id {
        return Err(AppError::Forbidden(
            "you can only update your own driver profile".to_string(),
        ));
    }

    if let Some(online_status) = update.online_status {
        driver.online_status = online_status;
    }
    if let Some(riding_status) = update.riding_status {
        driver.riding_status = riding_status;
    }
    if let Some(location) = update.location {
        driver.location = Some(location);
    }
    driver.updated_at = Utc::now();

    Ok(driver.clone())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::driver::VehicleType;

    fn apply_request() -> ApplyDriverRequest {
        ApplyDriverRequest {
            vehicle: Vehicle {
                vehicle_number: "DHK-1234".to_string(),
                vehicle_type: VehicleType::Car,
            },
            location: Some(GeoPoint {
                lng: 90.42,
                lat: 23.82,
            }),
        }
    }

    #[test]
    fn application_starts_pending_and_offline() {
        let state = AppState::new(5000.0);
        let driver = apply_as_driver(&state, Uuid::from_u128(1), apply_request()).unwrap();

        assert_eq!(driver.approval, ApprovalStatus::Pending);
        assert_eq!(driver.online_status, OnlineStatus::Offline);
        assert_eq!(driver.riding_status, RidingStatus::Idle);
        assert!(!driver.on_ride);
        assert_eq!(driver.total_earning, 0.0);
    }

    #[test]
    fn second_application_by_same_user_conflicts() {
        let state = AppState::new(5000.0);
        let user = Uuid::from_u128(1);
        apply_as_driver(&state, user, apply_request()).unwrap();

        let err = apply_as_driver(&state, user, apply_request()).expect_err("duplicate profile");
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(state.drivers.len(), 1);
    }

    #[test]
    fn approve_is_rejected_when_already_approved() {
        let state = AppState::new(5000.0);
        let driver = apply_as_driver(&state, Uuid::from_u128(1), apply_request()).unwrap();

        approve_driver(&state, driver.id).unwrap();
        let err = approve_driver(&state, driver.id).expect_err("already approved");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn rider_role_may_not_touch_driver_fields() {
        let state = AppState::new(5000.0);
        let driver = apply_as_driver(&state, Uuid::from_u128(1), apply_request()).unwrap();

        let rider = Principal {
            user_id: Uuid::from_u128(9),
            role: Role::Rider,
        };
        let update = DriverUpdate {
            online_status: Some(OnlineStatus::Active),
            ..DriverUpdate::default()
        };

        let err =
            update_driver_profile(&state, rider, driver.id, update).expect_err("rider blocked");
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn driver_updates_only_their_own_profile() {
        let state = AppState::new(5000.0);
        let own = apply_as_driver(&state, Uuid::from_u128(1), apply_request()).unwrap();
        let other = apply_as_driver(&state, Uuid::from_u128(2), apply_request()).unwrap();

        let principal = Principal {
            user_id: Uuid::from_u128(1),
            role: Role::Driver,
        };
        let update = DriverUpdate {
            online_status: Some(OnlineStatus::Active),
            ..DriverUpdate::default()
        };

        let updated = update_driver_profile(&state, principal, own.id, update.clone()).unwrap();
        assert_eq!(updated.online_status, OnlineStatus::Active);

        let err = update_driver_profile(&state, principal, other.id, update)
            .expect_err("foreign profile");
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
