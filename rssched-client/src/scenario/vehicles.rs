//! Transit vehicle registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitVehicleType {
    pub seats: u32,
    #[serde(default)]
    pub standing_room: u32,
}

impl TransitVehicleType {
    /// Seats plus standing room.
    pub fn capacity(&self) -> u32 {
        self.seats.saturating_add(self.standing_room)
    }
}

/// Vehicle types keyed by id and the type of every vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRegistry {
    pub vehicle_types: BTreeMap<String, TransitVehicleType>,
    /// Vehicle id to vehicle type id.
    pub vehicles: BTreeMap<String, String>,
}

impl VehicleRegistry {
    pub fn contains_vehicle(&self, vehicle: &str) -> bool {
        self.vehicles.contains_key(vehicle)
    }

    /// The vehicle type id of a vehicle.
    pub fn type_of(&self, vehicle: &str) -> Option<&str> {
        self.vehicles.get(vehicle).map(String::as_str)
    }
}
