//! Request builder error types.
//!
//! Add-calls fail with referential or structural errors as soon as they are
//! made. The global feasibility errors are only detected by `build()`.

use std::fmt;

use chrono::NaiveDateTime;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Location,
    VehicleType,
    Depot,
    Route,
    RouteSegment,
    Departure,
    DepartureSegment,
    MaintenanceSlot,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Location => "location",
            EntityKind::VehicleType => "vehicle type",
            EntityKind::Depot => "depot",
            EntityKind::Route => "route",
            EntityKind::RouteSegment => "route segment",
            EntityKind::Departure => "departure",
            EntityKind::DepartureSegment => "departure segment",
            EntityKind::MaintenanceSlot => "maintenance slot",
        })
    }
}

/// Errors raised while assembling or sealing a scheduler request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// An entity with the same id was already added
    #[error("{kind} with ID {id} already exists")]
    Duplicate { kind: EntityKind, id: String },

    /// A referenced entity has not been added
    #[error("{kind} with ID {id} does not exist")]
    NotFound { kind: EntityKind, id: String },

    /// A trip matrix relation was given an empty location id
    #[error("location ID cannot be empty")]
    EmptyLocationId,

    /// The depot already carries an upper bound for this vehicle type
    #[error("upper bound for vehicle type {vehicle_type} already set on depot {depot}")]
    DuplicateAllowedType { depot: String, vehicle_type: String },

    /// The route segment is not the next segment of the departure's route
    #[error(
        "route segment {route_segment} is not segment {position} of route {route} assigned to departure {departure}"
    )]
    SegmentNotOnRoute {
        route_segment: String,
        position: usize,
        route: String,
        departure: String,
    },

    /// The route segment is already covered by the departure
    #[error("duplicate route segment {route_segment} in departure {departure}")]
    DuplicateRouteSegment {
        route_segment: String,
        departure: String,
    },

    /// Departure time precedes the arrival of the previous segment
    #[error(
        "departure time {departure_time} on departure segment {segment} (route segment: {route_segment}) is before last arrival time {arrival_time} on departure segment {previous_segment} (route segment: {previous_route_segment})"
    )]
    DepartureBeforeArrival {
        segment: String,
        route_segment: String,
        departure_time: NaiveDateTime,
        previous_segment: String,
        previous_route_segment: String,
        arrival_time: NaiveDateTime,
    },

    /// A mandatory collection is empty at build time
    #[error("no {0} added, add at least one")]
    Empty(EntityKind),

    /// A parameter block has not been set at build time
    #[error("{0} parameters are not set")]
    MissingParameters(&'static str),

    /// A depot has no allowed vehicle types
    #[error("depot with ID {0} has no vehicle types assigned")]
    DepotWithoutVehicleTypes(String),

    /// A vehicle type is not allowed at any depot
    #[error("vehicle type with ID {0} has no depots assigned")]
    VehicleTypeWithoutDepot(String),

    /// The dead head trip matrix lacks a relation
    #[error("trip matrix is missing relation from {origin} to {destination}")]
    MissingRelation { origin: String, destination: String },

    /// The dead head trip matrix needs at least two locations
    #[error("at least two locations are required to build the trip matrix")]
    TooFewMatrixLocations,

    /// Origins and destinations of the relations differ
    #[error("origins and destinations of the trip matrix must contain the same locations")]
    InconsistentMatrix,
}
