//! Simulation scenario: network, timetable and vehicles.
//!
//! These are plain data structures. They can be read from a single JSON
//! document with [`Scenario::from_json_file`].

mod network;
mod timetable;
mod vehicles;

use std::path::Path;

pub use network::{Link, Network};
pub use timetable::{
    StopFacility, Timetable, TransitDeparture, TransitLine, TransitRoute, TransitRouteStop,
};
pub use vehicles::{TransitVehicleType, VehicleRegistry};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub network: Network,
    pub timetable: Timetable,
    pub vehicles: VehicleRegistry,
}

/// Errors reading a scenario document.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ScenarioError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// The vehicle type id of the vehicle serving a departure.
    pub fn vehicle_type_of(&self, departure: &TransitDeparture) -> Option<&str> {
        self.vehicles.type_of(&departure.vehicle)
    }
}
