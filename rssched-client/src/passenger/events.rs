//! Simulation events relevant to passenger counting.

use serde::{Deserialize, Serialize};

/// A simulation event. Times are seconds after midnight.
///
/// Events of any other type deserialize to [`Event::Other`] and are ignored
/// by the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    TransitDriverStarts {
        time: f64,
        driver: String,
        vehicle: String,
        line: String,
        route: String,
        departure: String,
    },
    VehicleArrivesAtFacility {
        time: f64,
        vehicle: String,
        facility: String,
    },
    VehicleDepartsAtFacility {
        time: f64,
        vehicle: String,
        facility: String,
    },
    PersonEntersVehicle {
        time: f64,
        person: String,
        vehicle: String,
    },
    PersonLeavesVehicle {
        time: f64,
        person: String,
        vehicle: String,
    },
    #[serde(other)]
    Other,
}

impl Event {
    pub fn time(&self) -> Option<f64> {
        match self {
            Event::TransitDriverStarts { time, .. }
            | Event::VehicleArrivesAtFacility { time, .. }
            | Event::VehicleDepartsAtFacility { time, .. }
            | Event::PersonEntersVehicle { time, .. }
            | Event::PersonLeavesVehicle { time, .. } => Some(*time),
            Event::Other => None,
        }
    }

    pub fn vehicle(&self) -> Option<&str> {
        match self {
            Event::TransitDriverStarts { vehicle, .. }
            | Event::VehicleArrivesAtFacility { vehicle, .. }
            | Event::VehicleDepartsAtFacility { vehicle, .. }
            | Event::PersonEntersVehicle { vehicle, .. }
            | Event::PersonLeavesVehicle { vehicle, .. } => Some(vehicle),
            Event::Other => None,
        }
    }
}
