//! Entities of a scheduler request.
//!
//! Entities are only created through [`super::RequestBuilder`]. Once the
//! request is built they are reachable through shared references only.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A place vehicles can be at: a stop, a depot site or a maintenance site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    /// Maximum number of vehicles present at any instant; `None` is unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_limit: Option<u32>,
}

/// A rolling stock type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleType {
    pub id: String,
    /// Total capacity including standing room.
    pub capacity: u32,
    pub seats: u32,
    /// Maximal number of units coupled into one formation.
    pub maximal_formation_count: u32,
}

/// Upper bound for one vehicle type at a depot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedType {
    pub vehicle_type: String,
    pub capacity: u32,
}

/// A depot where vehicles start and end the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depot {
    pub id: String,
    pub location: String,
    /// Total number of vehicles the depot can hold.
    pub capacity: u32,
    /// Sorted by vehicle type id.
    pub allowed_types: Vec<AllowedType>,
}

impl Depot {
    pub(crate) fn new(id: String, location: String, capacity: u32) -> Self {
        Self {
            id,
            location,
            capacity,
            allowed_types: Vec::new(),
        }
    }

    /// Insert an upper bound, keeping `allowed_types` sorted.
    ///
    /// Returns `false` if the vehicle type already has an upper bound.
    pub(crate) fn insert_allowed_type(&mut self, vehicle_type: String, capacity: u32) -> bool {
        match self.position_of(&vehicle_type) {
            Ok(_) => false,
            Err(idx) => {
                self.allowed_types.insert(
                    idx,
                    AllowedType {
                        vehicle_type,
                        capacity,
                    },
                );
                true
            }
        }
    }

    /// Whether vehicles of this type may be stored here.
    pub fn supports(&self, vehicle_type: &str) -> bool {
        self.position_of(vehicle_type).is_ok()
    }

    fn position_of(&self, vehicle_type: &str) -> Result<usize, usize> {
        self.allowed_types
            .binary_search_by(|t| t.vehicle_type.as_str().cmp(vehicle_type))
    }
}

/// One leg of a route between two locations where the formation may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub id: String,
    /// Position in the route, starting at 0.
    pub order: usize,
    pub origin: String,
    pub destination: String,
    /// Meters.
    pub distance: u32,
    /// Seconds.
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximal_formation_count: Option<u32>,
}

/// A sequence of segments served by one vehicle type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub vehicle_type: String,
    pub segments: Vec<RouteSegment>,
}

/// The departure of a route segment within a departure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureSegment {
    pub id: String,
    pub route_segment: String,
    /// Whole seconds.
    pub departure: NaiveDateTime,
    pub passengers: u32,
    pub seated: u32,
}

/// A concrete trip along a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    pub id: String,
    pub route: String,
    pub segments: Vec<DepartureSegment>,
}

impl Departure {
    /// Earliest segment departure, `None` for a departure without segments.
    pub fn earliest_departure(&self) -> Option<NaiveDateTime> {
        self.segments.iter().map(|s| s.departure).min()
    }
}

/// A time window in which vehicles can be maintained at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSlot {
    pub id: String,
    pub location: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Number of tracks, i.e. vehicles that can be maintained at once.
    pub track_count: u32,
}
