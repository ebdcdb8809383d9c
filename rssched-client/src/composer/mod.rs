//! Composition of a scheduling request from a simulation scenario.
//!
//! The composer walks the selected transit routes, splits them into
//! segments at the configured shunting locations and feeds routes,
//! departures, depots, maintenance slots and the dead head trip matrix into
//! a [`RequestBuilder`].

mod config;
mod segments;
mod selection;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, warn};

pub use config::{
    AllowedTypeConfig, ComposerConfig, ConfigError, CostsConfig, DepotConfig, DepotFacility,
    GlobalConfig, MaintenanceConfig, MaintenanceSlotConfig, ShuntingConfig, VehicleTypeConfig,
};
pub use segments::{
    Segment, collect_segments, extract_distance, extract_duration, extract_passengers,
    resolve_vehicle_type,
};
pub use selection::{
    LineFilter, LineSelection, NO_GROUP, SelectedLine, SelectionError, VehicleCategory,
    write_selection,
};

use crate::passenger::PassengerCounts;
use crate::request::{Request, RequestBuilder, RequestError};
use crate::router::{RouterError, TripMatrixRouter};
use crate::scenario::{Scenario, TransitRoute};

/// Maximum number of locations for which a dead head trip matrix is built.
pub const LOCATION_SIZE_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("route {0} has fewer than two stops")]
    TooFewStops(String),

    #[error("route {0} has no departures")]
    NoDepartures(String),

    #[error("route {route} of line {line} not found in timetable")]
    UnknownRoute { line: String, route: String },

    #[error("vehicle {vehicle} of route {route} not found in vehicle registry")]
    UnknownVehicle { vehicle: String, route: String },

    #[error("vehicle type {0} not found in vehicle registry")]
    UnknownVehicleType(String),

    #[error("stop facility {0} not found in timetable")]
    UnknownFacility(String),

    #[error("link {0} not found in network")]
    UnknownLink(String),

    #[error("location {location} of maintenance slot {slot} not found in timetable facilities")]
    UnknownMaintenanceLocation { slot: String, location: String },

    #[error(
        "too many locations ({count}) for a dead head trip matrix, at most {limit} are supported"
    )]
    TooManyLocations { count: usize, limit: usize },
}

/// Builder state of one composition.
#[derive(Default)]
struct Draft {
    builder: RequestBuilder,
    locations: BTreeSet<String>,
    /// Vehicle types allowed so far, per terminal depot.
    depot_types: BTreeMap<String, BTreeSet<String>>,
}

impl Draft {
    fn add_location(&mut self, id: &str) -> Result<(), RequestError> {
        if self.locations.insert(id.to_string()) {
            self.builder.add_location(id)?;
        }
        Ok(())
    }
}

/// Composes requests for the selected lines of a scenario.
#[derive(Debug, Clone)]
pub struct RequestComposer<'a> {
    config: &'a ComposerConfig,
    scenario: &'a Scenario,
    service_date: NaiveDate,
}

impl<'a> RequestComposer<'a> {
    /// Departures are placed on the configured service date, or today.
    pub fn new(config: &'a ComposerConfig, scenario: &'a Scenario) -> Self {
        let service_date = config
            .global
            .service_date
            .unwrap_or_else(|| Local::now().date_naive());
        Self {
            config,
            scenario,
            service_date,
        }
    }

    pub fn service_date(&self) -> NaiveDate {
        self.service_date
    }

    /// Compose and validate the request for `selection`, merging in the
    /// observed passenger counts.
    pub fn compose(
        &self,
        selection: &LineSelection,
        passengers: &PassengerCounts,
    ) -> Result<Request, ComposeError> {
        let routes = self.selected_routes(selection)?;
        info!(
            lines = selection.len(),
            routes = routes.len(),
            service_date = %self.service_date,
            "Composing scheduling request"
        );

        let mut draft = Draft::default();
        self.add_vehicle_types(&mut draft, &routes)?;
        for &(line, route) in &routes {
            self.add_route(&mut draft, line, route, passengers)?;
            if self.config.depot.create_at_terminal_locations {
                self.add_terminal_depot(&mut draft, route)?;
            }
        }
        if self.config.depot.create_at_terminal_locations {
            if !self.config.depot.facilities.is_empty() {
                warn!(
                    depots = self.config.depot.facilities.len(),
                    "Configured depots are ignored, depots are created at terminal locations"
                );
            }
        } else {
            self.add_configured_depots(&mut draft)?;
        }
        self.add_maintenance_slots(&mut draft)?;
        self.add_dead_head_trips(&mut draft)?;
        self.set_parameters(&mut draft.builder);

        Ok(draft.builder.build()?)
    }

    fn selected_routes<'s>(
        &'s self,
        selection: &'s LineSelection,
    ) -> Result<Vec<(&'s str, &'a TransitRoute)>, ComposeError> {
        let mut routes = Vec::new();
        for (line, selected) in selection.iter() {
            for route in &selected.routes {
                let found = self.scenario.timetable.route(line, route).ok_or_else(|| {
                    ComposeError::UnknownRoute {
                        line: line.to_string(),
                        route: route.clone(),
                    }
                })?;
                routes.push((line, found));
            }
        }
        Ok(routes)
    }

    fn add_vehicle_types(
        &self,
        draft: &mut Draft,
        routes: &[(&str, &TransitRoute)],
    ) -> Result<(), ComposeError> {
        if !self.config.global.vehicle_types.is_empty() {
            for vt in &self.config.global.vehicle_types {
                draft.builder.add_vehicle_type(
                    &vt.id,
                    vt.capacity,
                    vt.seats,
                    vt.maximal_formation_count,
                )?;
            }
            return Ok(());
        }

        let mut used = BTreeSet::new();
        for (_, route) in routes {
            for departure in &route.departures {
                let vehicle_type = self.scenario.vehicle_type_of(departure).ok_or_else(|| {
                    ComposeError::UnknownVehicle {
                        vehicle: departure.vehicle.clone(),
                        route: route.id.clone(),
                    }
                })?;
                used.insert(vehicle_type);
            }
        }
        for id in used {
            let vt = self
                .scenario
                .vehicles
                .vehicle_types
                .get(id)
                .ok_or_else(|| ComposeError::UnknownVehicleType(id.to_string()))?;
            draft.builder.add_vehicle_type(
                id,
                vt.capacity(),
                vt.seats,
                self.config.shunting.default_maximal_formation_count,
            )?;
        }
        Ok(())
    }

    fn add_route(
        &self,
        draft: &mut Draft,
        line: &str,
        route: &TransitRoute,
        passengers: &PassengerCounts,
    ) -> Result<(), ComposeError> {
        let segments = collect_segments(route, &self.config.shunting.on_route_locations)?;
        let vehicle_type = resolve_vehicle_type(self.scenario, route)?;
        draft.builder.add_route(&route.id, vehicle_type)?;

        let segment_ids: Vec<String> = (0..segments.len())
            .map(|i| format!("{}_{i}", route.id))
            .collect();
        for (segment, segment_id) in segments.iter().zip(&segment_ids) {
            draft.add_location(&segment.origin.facility)?;
            draft.add_location(&segment.destination.facility)?;
            draft.builder.add_segment_to_route_with_formation_limit(
                segment_id,
                &route.id,
                &segment.origin.facility,
                &segment.destination.facility,
                extract_distance(self.scenario, route, segment)?,
                extract_duration(segment),
                self.config.shunting.default_maximal_formation_count,
            )?;
        }

        for departure in &route.departures {
            let departure_id = format!("{}_{}", route.id, departure.id);
            draft.builder.add_departure(&departure_id, &route.id)?;
            let counts = passengers.get(line, &route.id, &departure.id);
            for (i, (segment, segment_id)) in segments.iter().zip(&segment_ids).enumerate() {
                let mut seconds = departure.departure_time;
                if i > 0 {
                    seconds += segment.origin.departure_or_arrival();
                }
                let (total, seated) = extract_passengers(counts, segment);
                draft.builder.add_segment_to_departure(
                    &format!("{departure_id}_{i}"),
                    &departure_id,
                    segment_id,
                    self.timestamp(seconds),
                    total,
                    seated,
                )?;
            }
        }
        debug!(
            route = %route.id,
            segments = segments.len(),
            departures = route.departures.len(),
            vehicle_type,
            "Added route"
        );
        Ok(())
    }

    fn add_terminal_depot(&self, draft: &mut Draft, route: &TransitRoute) -> Result<(), ComposeError> {
        let depot = &self.config.depot;
        let origin = route
            .stops
            .first()
            .ok_or_else(|| ComposeError::TooFewStops(route.id.clone()))?;
        let depot_id = format!("{}{}", depot.default_id_prefix, origin.facility);

        let allowed = match draft.depot_types.entry(depot_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                draft
                    .builder
                    .add_depot(&depot_id, &origin.facility, depot.default_capacity)?;
                debug!(depot = %depot_id, location = %origin.facility, "Created terminal depot");
                entry.insert(BTreeSet::new())
            }
        };
        for departure in &route.departures {
            let vehicle_type = self.scenario.vehicle_type_of(departure).ok_or_else(|| {
                ComposeError::UnknownVehicle {
                    vehicle: departure.vehicle.clone(),
                    route: route.id.clone(),
                }
            })?;
            if allowed.insert(vehicle_type.to_string()) {
                draft.builder.add_vehicle_type_to_depot(
                    &depot_id,
                    vehicle_type,
                    depot.default_capacity,
                )?;
            }
        }
        Ok(())
    }

    fn add_configured_depots(&self, draft: &mut Draft) -> Result<(), ComposeError> {
        for facility in &self.config.depot.facilities {
            draft
                .builder
                .add_depot(&facility.id, &facility.location, facility.capacity)?;
            for allowed in &facility.allowed_types {
                draft.builder.add_vehicle_type_to_depot(
                    &facility.id,
                    &allowed.vehicle_type,
                    allowed.capacity,
                )?;
            }
        }
        Ok(())
    }

    fn add_maintenance_slots(&self, draft: &mut Draft) -> Result<(), ComposeError> {
        for slot in &self.config.maintenance.slots {
            if self.scenario.timetable.facility(&slot.location).is_none() {
                return Err(ComposeError::UnknownMaintenanceLocation {
                    slot: slot.id.clone(),
                    location: slot.location.clone(),
                });
            }
            draft.add_location(&slot.location)?;
            draft.builder.add_maintenance_slot(
                &slot.id,
                &slot.location,
                slot.start,
                slot.end,
                slot.track_count,
            )?;
        }
        Ok(())
    }

    fn add_dead_head_trips(&self, draft: &mut Draft) -> Result<(), ComposeError> {
        let count = draft.locations.len();
        check_location_count(count)?;
        info!(
            locations = count,
            relations = count * count.saturating_sub(1),
            "Creating dead head trip matrix"
        );

        let router = TripMatrixRouter::new(
            &self.scenario.network,
            self.config.global.dead_head_trip_speed_limit,
        )?;
        for origin in &draft.locations {
            for destination in &draft.locations {
                if origin == destination {
                    continue;
                }
                let path =
                    router.route_facilities(&self.scenario.timetable, origin, destination)?;
                draft.builder.add_dead_head_trip(
                    origin,
                    destination,
                    path.duration,
                    path.distance,
                )?;
            }
        }
        Ok(())
    }

    fn set_parameters(&self, builder: &mut RequestBuilder) {
        let config = self.config;
        builder
            .set_shunting_parameters(
                config.shunting.minimal_duration,
                config.shunting.dead_head_trip_duration,
                config.shunting.coupling_duration,
            )
            .set_maintenance_parameters(config.maintenance.maximal_distance)
            .set_cost_parameters(config.costs.into())
            .set_global_parameters(
                config.global.forbid_dead_head_trips,
                config.global.day_limit_threshold,
            );
    }

    /// Seconds after midnight of the service date; may exceed one day.
    fn timestamp(&self, seconds: f64) -> NaiveDateTime {
        self.service_date.and_time(NaiveTime::MIN) + Duration::seconds(seconds.floor() as i64)
    }
}

fn check_location_count(count: usize) -> Result<(), ComposeError> {
    if count > LOCATION_SIZE_LIMIT {
        return Err(ComposeError::TooManyLocations {
            count,
            limit: LOCATION_SIZE_LIMIT,
        });
    }
    Ok(())
}
