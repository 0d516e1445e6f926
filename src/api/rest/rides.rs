use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::feedback::{give_rider_feedback, submit_driver_feedback, FeedbackInput};
use crate::engine::lifecycle;
use crate::engine::matching::{request_ride, MatchOutcome, RideRequest};
use crate::engine::queries;
use crate::error::AppError;
use crate::models::principal::{Principal, Role};
use crate::models::ride::{Ride, RideStatus};
use crate::state::AppState;

use super::require_role;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rides", get(all_rides))
        .route("/rides/request", post(request))
        .route("/rides/me", get(my_rides))
        .route("/rides/assigned", get(assigned_rides))
        .route("/rides/available", get(available_rides))
        .route("/rides/earnings", get(earnings))
        .route("/rides/:id", get(ride_by_id))
        .route("/rides/:id/status", patch(set_status))
        .route("/rides/:id/accept", post(accept))
        .route("/rides/:id/reject", post(reject))
        .route("/rides/:id/pickup", post(pickup))
        .route("/rides/:id/transit", post(transit))
        .route("/rides/:id/complete", post(complete))
        .route("/rides/:id/cancel", post(cancel))
        .route("/rides/:id/feedback/rider", post(rider_feedback))
        .route("/rides/:id/feedback/driver", post(driver_feedback))
}

#[derive(Deserialize)]
struct StatusUpdateRequest {
    status: RideStatus,
}

async fn request(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<RideRequest>,
) -> Result<Json<MatchOutcome>, AppError> {
    require_role(&principal, Role::Rider)?;
    Ok(Json(request_ride(&state, principal.user_id, payload)?))
}

async fn accept(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(lifecycle::accept_ride(&state, principal.user_id, id)?))
}

async fn reject(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(lifecycle::reject_ride(&state, principal.user_id, id)?))
}

async fn pickup(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(lifecycle::pick_up_ride(&state, principal.user_id, id)?))
}

async fn transit(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(lifecycle::mark_in_transit(
        &state,
        principal.user_id,
        id,
    )?))
}

async fn complete(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(lifecycle::complete_ride(
        &state,
        principal.user_id,
        id,
    )?))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::cancel_ride(&state, principal, id)?))
}

async fn set_status(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<Ride>, AppError> {
    require_role(&principal, Role::Admin)?;
    Ok(Json(lifecycle::update_ride_status(
        &state,
        id,
        payload.status,
    )?))
}

async fn rider_feedback(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackInput>,
) -> Result<Json<Ride>, AppError> {
    require_role(&principal, Role::Rider)?;
    Ok(Json(give_rider_feedback(
        &state,
        principal.user_id,
        id,
        payload,
    )?))
}

async fn driver_feedback(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackInput>,
) -> Result<Json<Ride>, AppError> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(submit_driver_feedback(
        &state,
        principal.user_id,
        id,
        payload,
    )?))
}

async fn my_rides(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<Ride>>, AppError> {
    require_role(&principal, Role::Rider)?;
    Ok(Json(queries::get_rider_rides(&state, principal.user_id)))
}

async fn assigned_rides(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<Ride>>, AppError> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(queries::get_driver_rides(&state, principal.user_id)?))
}

async fn available_rides(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<Ride>>, AppError> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(queries::get_available_rides(&state)))
}

async fn earnings(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<queries::EarningsReport>, AppError> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(queries::get_driver_earnings(
        &state,
        principal.user_id,
    )?))
}

async fn all_rides(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<Ride>>, AppError> {
    require_role(&principal, Role::Admin)?;
    Ok(Json(queries::get_all_rides(&state)))
}

async fn ride_by_id(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(queries::get_ride_by_id(&state, principal, id)?))
}
