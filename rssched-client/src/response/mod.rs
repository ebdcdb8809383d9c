//! The solver's reply to a scheduling request.
//!
//! Only deserialized, never validated against the request it answers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub info: Info,
    pub objective_value: ObjectiveValue,
    pub schedule: Schedule,
}

impl Response {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The fleet of a vehicle type, if the schedule uses it.
    pub fn fleet(&self, vehicle_type: &str) -> Option<&Fleet> {
        self.schedule
            .fleet
            .iter()
            .find(|f| f.vehicle_type == vehicle_type)
    }
}

/// Solver run metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub running_time: String,
    pub number_of_threads: u32,
    #[serde(rename = "timestampUTC")]
    pub timestamp_utc: NaiveDateTime,
    pub hostname: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveValue {
    pub unserved_passengers: u64,
    pub maintenance_violation: u64,
    pub vehicle_count: u32,
    pub costs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Schedule {
    pub depot_loads: Vec<DepotLoad>,
    pub fleet: Vec<Fleet>,
    pub departure_segments: Vec<DepartureSegmentAssignment>,
    pub maintenance_slots: Vec<MaintenanceSlotAssignment>,
    pub dead_head_trips: Vec<DeadHeadTripAssignment>,
}

/// Vehicles spawned at a depot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepotLoad {
    pub depot: String,
    #[serde(default)]
    pub load: Vec<VehicleTypeLoad>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTypeLoad {
    pub vehicle_type: String,
    pub spawn_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fleet {
    pub vehicle_type: String,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    /// Vehicle ids that run one after the other over the days.
    #[serde(default)]
    pub vehicle_cycles: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub start_depot: String,
    pub end_depot: String,
    #[serde(default)]
    pub departure_segments: Vec<VehicleDepartureSegment>,
    #[serde(default)]
    pub maintenance_slots: Vec<VehicleMaintenanceSlot>,
    #[serde(default)]
    pub dead_head_trips: Vec<VehicleDeadHeadTrip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDepartureSegment {
    pub departure_segment: String,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleMaintenanceSlot {
    pub maintenance_slot: String,
    pub location: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDeadHeadTrip {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
}

/// A departure segment and the formation serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureSegmentAssignment {
    pub departure_segment: String,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub vehicle_type: String,
    /// Vehicle ids, front to back.
    #[serde(default)]
    pub formation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSlotAssignment {
    pub maintenance_slot: String,
    pub location: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub formation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadHeadTripAssignment {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    #[serde(default)]
    pub formation: Vec<String>,
}
