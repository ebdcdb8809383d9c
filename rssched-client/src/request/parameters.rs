//! Solver parameter blocks of a scheduler request.

use serde::{Deserialize, Serialize};

/// Shunting durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShuntingParameters {
    /// Minimum time always needed between two activities.
    pub minimal_duration: u32,
    /// Time to change from a service trip to a dead head trip.
    pub dead_head_trip_duration: u32,
    /// Additional time to couple or uncouple a vehicle.
    pub coupling_duration: u32,
}

/// Maintenance limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceParameters {
    /// Maximal distance in meters a unit may travel between maintenance slots.
    pub maximal_distance: u32,
}

/// Cost rates, all per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostParameters {
    /// Paid by each formation on a service trip.
    pub staff: u32,
    /// Paid per vehicle of a formation on a service trip.
    pub service_trip: u32,
    pub maintenance: u32,
    pub dead_head_trip: u32,
    pub idle: u32,
}

/// The complete parameter block of a sealed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub forbid_dead_head_trips: bool,
    /// Vehicles stopping for less than this many seconds do not count into a
    /// location's day limit.
    pub day_limit_threshold: u32,
    pub shunting: ShuntingParameters,
    pub maintenance: MaintenanceParameters,
    pub costs: CostParameters,
}
