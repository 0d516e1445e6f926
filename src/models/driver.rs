use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longitude first, matching the stored [lng, lat] coordinate order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum OnlineStatus {
    Active,
    Offline,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RidingStatus {
    Idle,
    WaitingForPickup,
    InTransit,
    Unavailable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Suspended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum VehicleType {
    Bike,
    Car,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_number: String,
    pub vehicle_type: VehicleType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle: Vehicle,
    pub location: Option<GeoPoint>,
    pub online_status: OnlineStatus,
    pub riding_status: RidingStatus,
    pub on_ride: bool,
    pub approval: ApprovalStatus,
    pub total_earning: f64,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn new(user_id: Uuid, vehicle: Vehicle, location: Option<GeoPoint>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            vehicle,
            location,
            online_status: OnlineStatus::Offline,
            riding_status: RidingStatus::Idle,
            on_ride: false,
            approval: ApprovalStatus::Pending,
            total_earning: 0.0,
            updated_at: Utc::now(),
        }
    }
}
