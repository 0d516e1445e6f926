use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::principal::{Principal, Role};
use crate::models::ride::{Ride, RideStatus};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EarningsReport {
    pub total_earnings: f64,
    pub ride_count: usize,
    pub rides: Vec<Ride>,
}

pub fn get_rider_rides(state: &AppState, rider_id: Uuid) -> Vec<Ride> {
    let mut rides: Vec<Ride> = state
        .rides
        .iter()
        .filter(|entry| entry.value().rider_id == rider_id)
        .map(|entry| entry.value().clone())
        .collect();
    rides.sort_by_key(|ride| std::cmp::Reverse(ride.requested_at));
    rides
}

pub fn get_driver_rides(state: &AppState, driver_user: Uuid) -> Result<Vec<Ride>, AppError> {
    let profile_id = state
        .driver_id_for_user(driver_user)
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))?;

    let mut rides: Vec<Ride> = state
        .rides
        .iter()
        .filter(|entry| entry.value().driver_id == Some(profile_id))
        .map(|entry| entry.value().clone())
        .collect();
    rides.sort_by_key(|ride| std::cmp::Reverse(ride.requested_at));
    Ok(rides)
}

/// Open requests, oldest first, the order drivers should work them in.
pub fn get_available_rides(state: &AppState) -> Vec<Ride> {
    let mut rides: Vec<Ride> = state
        .rides
        .iter()
        .filter(|entry| entry.value().status == RideStatus::Requested)
        .map(|entry| entry.value().clone())
        .collect();
    rides.sort_by_key(|ride| ride.requested_at);
    rides
}

pub fn get_all_rides(state: &AppState) -> Vec<Ride> {
    let mut rides: Vec<Ride> = state
        .rides
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    rides.sort_by_key(|ride| std::cmp::Reverse(ride.requested_at));
    rides
}

pub fn get_ride_by_id(
    state: &AppState,
    principal: Principal,
    ride_id: Uuid,
) -> Result<Ride, AppError> {
    let ride = state
        .rides
        .get(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?
        .clone();

    let allowed = match principal.role {
        Role::Admin => true,
        Role::Rider => ride.rider_id == principal.user_id,
        Role::Driver => {
            let profile_id = state.driver_id_for_user(principal.user_id);
            profile_id.is_some() && ride.driver_id == profile_id
        }
    };

    if !allowed {
        return Err(AppError::Forbidden(
            "you have no access to this ride".to_string(),
        ));
    }

    Ok(ride)
}

/// The `total_earning` accumulator on the driver record is the source of
/// truth; the completed-ride list rides along for detail views.
pub fn get_driver_earnings(
    state: &AppState,
    driver_user: Uuid,
) -> Result<EarningsReport, AppError> {
    let profile_id = state
        .driver_id_for_user(driver_user)
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))?;

    let total_earnings = state
        .drivers
        .get(&profile_id)
        .map(|driver| driver.total_earning)
        .unwrap_or(0.0);

    let mut rides: Vec<Ride> = state
        .rides
        .iter()
        .filter(|entry| {
            entry.value().driver_id == Some(profile_id)
                && entry.value().status == RideStatus::Completed
        })
        .map(|entry| entry.value().clone())
        .collect();
    rides.sort_by_key(|ride| std::cmp::Reverse(ride.completed_at));

    Ok(EarningsReport {
        total_earnings,
        ride_count: rides.len(),
        rides,
    })
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::engine::lifecycle::{accept_ride, complete_ride, mark_in_transit, pick_up_ride};
    use crate::engine::matching::{request_ride, RideRequest};
    use crate::models::driver::{
        ApprovalStatus, Driver, GeoPoint, OnlineStatus, Vehicle, VehicleType,
    };
    use crate::models::ride::PaymentMethod;

    fn add_driver(state: &AppState, user_seed: u128) -> Uuid {
        let user_id = Uuid::from_u128(user_seed);
        let mut driver = Driver::new(
            user_id,
            Vehicle {
                vehicle_number: "DHK-1234".to_string(),
                vehicle_type: VehicleType::Car,
            },
            Some(GeoPoint {
                lng: 90.42,
                lat: 23.82,
            }),
        );
        driver.online_status = OnlineStatus::Active;
        driver.approval = ApprovalStatus::Approved;
        state.drivers.insert(driver.id, driver);
        user_id
    }

    fn ride_through_completion(state: &AppState, driver_user: Uuid, rider_seed: u128, fare: f64) {
        let ride = request_ride(
            state,
            Uuid::from_u128(rider_seed),
            RideRequest {
                pickup: GeoPoint {
                    lng: 90.41,
                    lat: 23.81,
                },
                destination: GeoPoint {
                    lng: 90.38,
                    lat: 23.75,
                },
                fare: Some(fare),
                payment_method: PaymentMethod::Cash,
            },
        )
        .unwrap()
        .ride;

        accept_ride(state, driver_user, ride.id).unwrap();
        pick_up_ride(state, driver_user, ride.id).unwrap();
        mark_in_transit(state, driver_user, ride.id).unwrap();
        complete_ride(state, driver_user, ride.id).unwrap();
    }

    #[test]
    fn earnings_accumulator_matches_completed_ride_sum() {
        let state = AppState::new(5000.0);
        let driver_user = add_driver(&state, 100);

        ride_through_completion(&state, driver_user, 9, 100.0);
        ride_through_completion(&state, driver_user, 10, 150.0);

        let report = get_driver_earnings(&state, driver_user).unwrap();
        assert_eq!(report.ride_count, 2);
        assert_eq!(report.total_earnings, 250.0);

        let derived: f64 = report.rides.iter().map(|ride| ride.fare).sum();
        assert_eq!(report.total_earnings, derived);
    }

    #[test]
    fn available_rides_come_back_oldest_first() {
        let state = AppState::new(5000.0);
        add_driver(&state, 100);

        let first = request_ride(
            &state,
            Uuid::from_u128(9),
            RideRequest {
                pickup: GeoPoint {
                    lng: 90.41,
                    lat: 23.81,
                },
                destination: GeoPoint {
                    lng: 90.38,
                    lat: 23.75,
                },
                fare: Some(100.0),
                payment_method: PaymentMethod::Cash,
            },
        )
        .unwrap()
        .ride;
        let second = request_ride(
            &state,
            Uuid::from_u128(10),
            RideRequest {
                pickup: GeoPoint {
                    lng: 90.41,
                    lat: 23.81,
                },
                destination: GeoPoint {
                    lng: 90.38,
                    lat: 23.75,
                },
                fare: Some(100.0),
                payment_method: PaymentMethod::Cash,
            },
        )
        .unwrap()
        .ride;

        let available = get_available_rides(&state);
        assert_eq!(available.len(), 2);
        assert_eq!(available[0].id, first.id);
        assert_eq!(available[1].id, second.id);
    }

    #[test]
    fn ride_detail_is_hidden_from_unrelated_users() {
        let state = AppState::new(5000.0);
        add_driver(&state, 100);

        let ride = request_ride(
            &state,
            Uuid::from_u128(9),
            RideRequest {
                pickup: GeoPoint {
                    lng: 90.41,
                    lat: 23.81,
                },
                destination: GeoPoint {
                    lng: 90.38,
                    lat: 23.75,
                },
                fare: Some(100.0),
                payment_method: PaymentMethod::Cash,
            },
        )
        .unwrap()
        .ride;

        let owner = Principal {
            user_id: Uuid::from_u128(9),
            role: Role::Rider,
        };
        assert!(get_ride_by_id(&state, owner, ride.id).is_ok());

        let stranger = Principal {
            user_id: Uuid::from_u128(77),
            role: Role::Rider,
        };
        let err = get_ride_by_id(&state, stranger, ride.id).expect_err("no access");
        assert!(matches!(err, AppError::Forbidden(_)));

        let admin = Principal {
            user_id: Uuid::from_u128(1),
            role: Role::Admin,
        };
        assert!(get_ride_by_id(&state, admin, ride.id).is_ok());
    }
}
