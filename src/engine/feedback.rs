use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ride::{Feedback, Ride, RideStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackInput {
    pub rating: u8,
    pub comment: Option<String>,
}

pub fn give_rider_feedback(
    state: &AppState,
    rider_id: Uuid,
    ride_id: Uuid,
    input: FeedbackInput,
) -> Result<Ride, AppError> {
    validate_rating(input.rating)?;

    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if ride.rider_id != rider_id {
        return Err(AppError::Forbidden(
            "you can only give feedback on your own rides".to_string(),
        ));
    }
    if ride.status != RideStatus::Completed {
        return Err(AppError::Conflict(
            "feedback is allowed only after the ride is completed".to_string(),
        ));
    }
    if ride.rider_feedback.is_some() {
        return Err(AppError::Conflict("feedback already submitted".to_string()));
    }

    ride.rider_feedback = Some(Feedback {
        rating: input.rating,
        comment: input.comment,
    });

    info!(ride_id = %ride.id, rating = input.rating, "rider feedback recorded");
    Ok(ride.clone())
}

pub fn submit_driver_feedback(
    state: &AppState,
    driver_user: Uuid,
    ride_id: Uuid,
    input: FeedbackInput,
) -> Result<Ride, AppError> {
    validate_rating(input.rating)?;

    let profile_id = state
        .driver_id_for_user(driver_user)
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))?;

    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound("ride not found".to_string()))?;

    if ride.driver_id != Some(profile_id) {
        return Err(AppError::Forbidden(
            "you are not assigned to this ride".to_string(),
        ));
    }
    if ride.status != RideStatus::Completed {
        return Err(AppError::Conflict(
            "feedback is allowed only after the ride is completed".to_string(),
        ));
    }
    if ride.driver_feedback.is_some() {
        return Err(AppError::Conflict("feedback already submitted".to_string()));
    }

    ride.driver_feedback = Some(Feedback {
        rating: input.rating,
        comment: input.comment,
    });

    info!(ride_id = %ride.id, rating = input.rating, "driver feedback recorded");
    Ok(ride.clone())
}

fn validate_rating(rating: u8) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
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

    fn feedback(rating: u8) -> FeedbackInput {
        FeedbackInput {
            rating,
            comment: Some("smooth trip".to_string()),
        }
    }

    fn completed_ride(state: &AppState) -> (Uuid, Uuid, Uuid) {
        let driver_user = Uuid::from_u128(100);
        let rider = Uuid::from_u128(9);

        let mut driver = Driver::new(
            driver_user,
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

        let ride = request_ride(
            state,
            rider,
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

        accept_ride(state, driver_user, ride.id).unwrap();
        pick_up_ride(state, driver_user, ride.id).unwrap();
        mark_in_transit(state, driver_user, ride.id).unwrap();
        complete_ride(state, driver_user, ride.id).unwrap();

        (rider, driver_user, ride.id)
    }

    #[test]
    fn both_sides_can_rate_a_completed_ride_once() {
        let state = AppState::new(5000.0);
        let (rider, driver_user, ride_id) = completed_ride(&state);

        let rated = give_rider_feedback(&state, rider, ride_id, feedback(5)).unwrap();
        assert_eq!(rated.rider_feedback.as_ref().unwrap().rating, 5);

        let err =
            give_rider_feedback(&state, rider, ride_id, feedback(4)).expect_err("second rating");
        assert!(matches!(err, AppError::Conflict(_)));

        let rated = submit_driver_feedback(&state, driver_user, ride_id, feedback(4)).unwrap();
        assert_eq!(rated.driver_feedback.as_ref().unwrap().rating, 4);

        let err = submit_driver_feedback(&state, driver_user, ride_id, feedback(3))
            .expect_err("second rating");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn feedback_requires_a_completed_ride() {
        let state = AppState::new(5000.0);
        let driver_user = Uuid::from_u128(100);
        let rider = Uuid::from_u128(9);

        let mut driver = Driver::new(
            driver_user,
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

        let ride = request_ride(
            &state,
            rider,
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

        let err = give_rider_feedback(&state, rider, ride.id, feedback(5))
            .expect_err("ride is still requested");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn feedback_from_a_stranger_is_forbidden() {
        let state = AppState::new(5000.0);
        let (_rider, _driver_user, ride_id) = completed_ride(&state);

        let err = give_rider_feedback(&state, Uuid::from_u128(77), ride_id, feedback(1))
            .expect_err("not the rider");
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn out_of_range_rating_is_rejected() {
        let state = AppState::new(5000.0);
        let (rider, _driver_user, ride_id) = completed_ride(&state);

        let err = give_rider_feedback(&state, rider, ride_id, feedback(0)).expect_err("too low");
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = give_rider_feedback(&state, rider, ride_id, feedback(6)).expect_err("too high");
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
