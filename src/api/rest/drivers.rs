use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::engine::directory;
use crate::error::AppError;
use crate::models::driver::Driver;
use crate::models::principal::{Principal, Role};
use crate::state::AppState;

use super::require_role;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", get(list_drivers))
        .route("/drivers/apply", post(apply))
        .route("/drivers/me", get(my_profile).patch(update_me))
        .route("/drivers/:id", patch(update_driver))
        .route("/drivers/:id/approve", patch(approve))
        .route("/drivers/:id/suspend", patch(suspend))
}

async fn apply(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<directory::ApplyDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(directory::apply_as_driver(
        &state,
        principal.user_id,
        payload,
    )?))
}

async fn approve(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    require_role(&principal, Role::Admin)?;
    Ok(Json(directory::approve_driver(&state, id)?))
}

async fn suspend(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    require_role(&principal, Role::Admin)?;
    Ok(Json(directory::suspend_driver(&state, id)?))
}

async fn my_profile(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(directory::get_driver_profile(
        &state,
        principal.user_id,
    )?))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<directory::DriverUpdate>,
) -> Result<Json<Driver>, AppError> {
    require_role(&principal, Role::Driver)?;
    let profile_id = state
        .driver_id_for_user(principal.user_id)
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))?;

    Ok(Json(directory::update_driver_profile(
        &state, principal, profile_id, payload,
    )?))
}

async fn update_driver(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<directory::DriverUpdate>,
) -> Result<Json<Driver>, AppError> {
    require_role(&principal, Role::Admin)?;
    Ok(Json(directory::update_driver_profile(
        &state, principal, id, payload,
    )?))
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<Driver>>, AppError> {
    require_role(&principal, Role::Admin)?;
    Ok(Json(directory::list_drivers(&state)))
}
