//! Incrementally validating builder for scheduler requests.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::debug;

use super::error::{EntityKind, RequestError};
use super::model::{
    Departure, DepartureSegment, Depot, Location, MaintenanceSlot, Route, RouteSegment,
    VehicleType,
};
use super::parameters::{CostParameters, MaintenanceParameters, Parameters, ShuntingParameters};
use super::trip_matrix::TripMatrixBuilder;
use super::Request;

/// Where a route segment sits: its route and its position on that route.
#[derive(Debug, Clone)]
struct SegmentRef {
    route: String,
    order: usize,
}

/// Builder for a [`Request`].
///
/// Every add-call validates its references against what has been added so
/// far and fails fast. Global invariants (non-empty collections, parameter
/// blocks, depot coverage, a complete trip matrix) are checked by
/// [`RequestBuilder::build`], which consumes the builder.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use rssched_client::request::{CostParameters, RequestBuilder};
///
/// let start = NaiveDate::from_ymd_opt(2020, 1, 1)
///     .unwrap()
///     .and_hms_opt(6, 0, 0)
///     .unwrap();
///
/// let mut builder = RequestBuilder::new();
/// builder
///     .add_location("a")?
///     .add_location("b")?
///     .add_vehicle_type("vt", 200, 120, 2)?
///     .add_depot("dpt_a", "a", 10)?
///     .add_vehicle_type_to_depot("dpt_a", "vt", 10)?
///     .add_route("r", "vt")?
///     .add_segment_to_route("r_0", "r", "a", "b", 5000, 600)?
///     .add_departure("d", "r")?
///     .add_segment_to_departure("d_0", "d", "r_0", start, 80, 40)?
///     .add_dead_head_trip("a", "b", 500, 5000)?
///     .add_dead_head_trip("b", "a", 500, 5000)?;
/// builder
///     .set_shunting_parameters(60, 120, 180)
///     .set_maintenance_parameters(15_000_000)
///     .set_cost_parameters(CostParameters {
///         staff: 100,
///         service_trip: 50,
///         maintenance: 200,
///         dead_head_trip: 75,
///         idle: 25,
///     })
///     .set_global_parameters(false, 0);
///
/// let request = builder.build()?;
/// assert_eq!(request.dead_head_trips().indices(), ["a", "b"]);
/// # Ok::<(), rssched_client::request::RequestError>(())
/// ```
#[derive(Debug, Default)]
pub struct RequestBuilder {
    vehicle_types: BTreeMap<String, VehicleType>,
    locations: BTreeMap<String, Location>,
    depots: BTreeMap<String, Depot>,
    routes: BTreeMap<String, Route>,
    route_segments: HashMap<String, SegmentRef>,
    departures: BTreeMap<String, Departure>,
    departure_segments: HashSet<String>,
    maintenance_slots: BTreeMap<String, MaintenanceSlot>,
    trip_matrix: TripMatrixBuilder,
    shunting: Option<ShuntingParameters>,
    maintenance: Option<MaintenanceParameters>,
    costs: Option<CostParameters>,
    global: Option<(bool, u32)>,
}

impl RequestBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a location without a day limit.
    pub fn add_location(&mut self, id: &str) -> Result<&mut Self, RequestError> {
        self.insert_location(id, None)
    }

    /// Add a location where at most `day_limit` vehicles may be at any time.
    pub fn add_location_with_day_limit(
        &mut self,
        id: &str,
        day_limit: u32,
    ) -> Result<&mut Self, RequestError> {
        self.insert_location(id, Some(day_limit))
    }

    fn insert_location(
        &mut self,
        id: &str,
        day_limit: Option<u32>,
    ) -> Result<&mut Self, RequestError> {
        ensure_absent(&self.locations, EntityKind::Location, id)?;
        self.locations.insert(
            id.to_string(),
            Location {
                id: id.to_string(),
                day_limit,
            },
        );
        Ok(self)
    }

    /// Add a vehicle type.
    pub fn add_vehicle_type(
        &mut self,
        id: &str,
        capacity: u32,
        seats: u32,
        maximal_formation_count: u32,
    ) -> Result<&mut Self, RequestError> {
        ensure_absent(&self.vehicle_types, EntityKind::VehicleType, id)?;
        self.vehicle_types.insert(
            id.to_string(),
            VehicleType {
                id: id.to_string(),
                capacity,
                seats,
                maximal_formation_count,
            },
        );
        Ok(self)
    }

    /// Add a depot at an existing location.
    pub fn add_depot(
        &mut self,
        id: &str,
        location: &str,
        capacity: u32,
    ) -> Result<&mut Self, RequestError> {
        ensure_absent(&self.depots, EntityKind::Depot, id)?;
        ensure_present(&self.locations, EntityKind::Location, location)?;
        self.depots.insert(
            id.to_string(),
            Depot::new(id.to_string(), location.to_string(), capacity),
        );
        Ok(self)
    }

    /// Allow a vehicle type at a depot, with an upper bound on its count.
    pub fn add_vehicle_type_to_depot(
        &mut self,
        depot: &str,
        vehicle_type: &str,
        upper_bound: u32,
    ) -> Result<&mut Self, RequestError> {
        ensure_present(&self.vehicle_types, EntityKind::VehicleType, vehicle_type)?;
        let entry = self
            .depots
            .get_mut(depot)
            .ok_or_else(|| not_found(EntityKind::Depot, depot))?;
        if !entry.insert_allowed_type(vehicle_type.to_string(), upper_bound) {
            return Err(RequestError::DuplicateAllowedType {
                depot: depot.to_string(),
                vehicle_type: vehicle_type.to_string(),
            });
        }
        Ok(self)
    }

    /// Add a route served by an existing vehicle type.
    pub fn add_route(&mut self, id: &str, vehicle_type: &str) -> Result<&mut Self, RequestError> {
        ensure_absent(&self.routes, EntityKind::Route, id)?;
        ensure_present(&self.vehicle_types, EntityKind::VehicleType, vehicle_type)?;
        self.routes.insert(
            id.to_string(),
            Route {
                id: id.to_string(),
                vehicle_type: vehicle_type.to_string(),
                segments: Vec::new(),
            },
        );
        Ok(self)
    }

    /// Append a segment to a route.
    pub fn add_segment_to_route(
        &mut self,
        id: &str,
        route: &str,
        origin: &str,
        destination: &str,
        distance: u32,
        duration: u32,
    ) -> Result<&mut Self, RequestError> {
        self.push_route_segment(id, route, origin, destination, distance, duration, None)
    }

    /// Append a segment to a route, limiting the formation size on it.
    #[allow(clippy::too_many_arguments)]
    pub fn add_segment_to_route_with_formation_limit(
        &mut self,
        id: &str,
        route: &str,
        origin: &str,
        destination: &str,
        distance: u32,
        duration: u32,
        maximal_formation_count: u32,
    ) -> Result<&mut Self, RequestError> {
        self.push_route_segment(
            id,
            route,
            origin,
            destination,
            distance,
            duration,
            Some(maximal_formation_count),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn push_route_segment(
        &mut self,
        id: &str,
        route: &str,
        origin: &str,
        destination: &str,
        distance: u32,
        duration: u32,
        maximal_formation_count: Option<u32>,
    ) -> Result<&mut Self, RequestError> {
        if self.route_segments.contains_key(id) {
            return Err(duplicate(EntityKind::RouteSegment, id));
        }
        ensure_present(&self.locations, EntityKind::Location, origin)?;
        ensure_present(&self.locations, EntityKind::Location, destination)?;
        let entry = self
            .routes
            .get_mut(route)
            .ok_or_else(|| not_found(EntityKind::Route, route))?;

        let order = entry.segments.len();
        entry.segments.push(RouteSegment {
            id: id.to_string(),
            order,
            origin: origin.to_string(),
            destination: destination.to_string(),
            distance,
            duration,
            maximal_formation_count,
        });
        self.route_segments.insert(
            id.to_string(),
            SegmentRef {
                route: route.to_string(),
                order,
            },
        );
        Ok(self)
    }

    /// Add a departure on an existing route.
    pub fn add_departure(&mut self, id: &str, route: &str) -> Result<&mut Self, RequestError> {
        ensure_absent(&self.departures, EntityKind::Departure, id)?;
        ensure_present(&self.routes, EntityKind::Route, route)?;
        self.departures.insert(
            id.to_string(),
            Departure {
                id: id.to_string(),
                route: route.to_string(),
                segments: Vec::new(),
            },
        );
        Ok(self)
    }

    /// Append the departure of the next route segment to a departure.
    ///
    /// Segments must be added in route order, each at most once, and a
    /// segment may not depart before the previous one arrives. The departure
    /// time is truncated to whole seconds.
    pub fn add_segment_to_departure(
        &mut self,
        id: &str,
        departure: &str,
        route_segment: &str,
        departure_time: NaiveDateTime,
        passengers: u32,
        seated: u32,
    ) -> Result<&mut Self, RequestError> {
        if self.departure_segments.contains(id) {
            return Err(duplicate(EntityKind::DepartureSegment, id));
        }
        let entry = self
            .departures
            .get_mut(departure)
            .ok_or_else(|| not_found(EntityKind::Departure, departure))?;
        let segment = self
            .route_segments
            .get(route_segment)
            .ok_or_else(|| not_found(EntityKind::RouteSegment, route_segment))?;
        let route = self
            .routes
            .get(&entry.route)
            .ok_or_else(|| not_found(EntityKind::Route, &entry.route))?;

        if entry
            .segments
            .iter()
            .any(|s| s.route_segment == route_segment)
        {
            return Err(RequestError::DuplicateRouteSegment {
                route_segment: route_segment.to_string(),
                departure: departure.to_string(),
            });
        }

        let position = entry.segments.len();
        if segment.route != entry.route || segment.order != position {
            return Err(RequestError::SegmentNotOnRoute {
                route_segment: route_segment.to_string(),
                position,
                route: route.id.clone(),
                departure: departure.to_string(),
            });
        }

        let departure_time = truncate_to_seconds(departure_time);
        if let (Some(previous), Some(previous_route_segment)) = (
            entry.segments.last(),
            position.checked_sub(1).and_then(|i| route.segments.get(i)),
        ) {
            let arrival_time =
                previous.departure + Duration::seconds(i64::from(previous_route_segment.duration));
            if departure_time < arrival_time {
                return Err(RequestError::DepartureBeforeArrival {
                    segment: id.to_string(),
                    route_segment: route_segment.to_string(),
                    departure_time,
                    previous_segment: previous.id.clone(),
                    previous_route_segment: previous_route_segment.id.clone(),
                    arrival_time,
                });
            }
        }

        entry.segments.push(DepartureSegment {
            id: id.to_string(),
            route_segment: route_segment.to_string(),
            departure: departure_time,
            passengers,
            seated,
        });
        self.departure_segments.insert(id.to_string());
        Ok(self)
    }

    /// Add a maintenance slot at an existing location.
    ///
    /// An `end` before `start` is an overnight slot and ends on the next day.
    pub fn add_maintenance_slot(
        &mut self,
        id: &str,
        location: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        track_count: u32,
    ) -> Result<&mut Self, RequestError> {
        ensure_absent(&self.maintenance_slots, EntityKind::MaintenanceSlot, id)?;
        ensure_present(&self.locations, EntityKind::Location, location)?;

        let start = truncate_to_seconds(start);
        let mut end = truncate_to_seconds(end);
        if end < start {
            debug!(slot = id, %start, %end, "Maintenance slot ends on the next day");
            end += Duration::days(1);
        }

        self.maintenance_slots.insert(
            id.to_string(),
            MaintenanceSlot {
                id: id.to_string(),
                location: location.to_string(),
                start,
                end,
                track_count,
            },
        );
        Ok(self)
    }

    /// Add (or replace) the dead head trip from `origin` to `destination`.
    pub fn add_dead_head_trip(
        &mut self,
        origin: &str,
        destination: &str,
        duration: u32,
        distance: u32,
    ) -> Result<&mut Self, RequestError> {
        if origin.is_empty() || destination.is_empty() {
            return Err(RequestError::EmptyLocationId);
        }
        ensure_present(&self.locations, EntityKind::Location, origin)?;
        ensure_present(&self.locations, EntityKind::Location, destination)?;
        self.trip_matrix
            .add_relation(origin, destination, duration, distance)?;
        Ok(self)
    }

    /// Set the shunting durations, in seconds.
    pub fn set_shunting_parameters(
        &mut self,
        minimal_duration: u32,
        dead_head_trip_duration: u32,
        coupling_duration: u32,
    ) -> &mut Self {
        self.shunting = Some(ShuntingParameters {
            minimal_duration,
            dead_head_trip_duration,
            coupling_duration,
        });
        self
    }

    /// Set the maximal distance in meters between two maintenance visits.
    pub fn set_maintenance_parameters(&mut self, maximal_distance: u32) -> &mut Self {
        self.maintenance = Some(MaintenanceParameters { maximal_distance });
        self
    }

    /// Set the cost rates.
    pub fn set_cost_parameters(&mut self, costs: CostParameters) -> &mut Self {
        self.costs = Some(costs);
        self
    }

    /// Set whether dead head trips are forbidden and the day limit threshold
    /// in seconds.
    pub fn set_global_parameters(
        &mut self,
        forbid_dead_head_trips: bool,
        day_limit_threshold: u32,
    ) -> &mut Self {
        self.global = Some((forbid_dead_head_trips, day_limit_threshold));
        self
    }

    /// Validate the global invariants and seal the request.
    pub fn build(self) -> Result<Request, RequestError> {
        let parameters = self.validate()?;

        let mut departures: Vec<Departure> = self.departures.into_values().collect();
        departures.sort_by(|a, b| {
            let key = |d: &Departure| {
                let earliest = d.earliest_departure();
                (earliest.is_none(), earliest)
            };
            key(a).cmp(&key(b)).then_with(|| a.id.cmp(&b.id))
        });

        let mut maintenance_slots: Vec<MaintenanceSlot> =
            self.maintenance_slots.into_values().collect();
        maintenance_slots.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        Ok(Request {
            vehicle_types: self.vehicle_types.into_values().collect(),
            locations: self.locations.into_values().collect(),
            depots: self.depots.into_values().collect(),
            routes: self.routes.into_values().collect(),
            departures,
            maintenance_slots,
            dead_head_trips: self.trip_matrix.build()?,
            parameters,
        })
    }

    fn validate(&self) -> Result<Parameters, RequestError> {
        if self.vehicle_types.is_empty() {
            return Err(RequestError::Empty(EntityKind::VehicleType));
        }
        if self.locations.is_empty() {
            return Err(RequestError::Empty(EntityKind::Location));
        }
        if self.depots.is_empty() {
            return Err(RequestError::Empty(EntityKind::Depot));
        }
        if self.routes.is_empty() {
            return Err(RequestError::Empty(EntityKind::Route));
        }
        if self.departures.is_empty() {
            return Err(RequestError::Empty(EntityKind::Departure));
        }

        let shunting = self
            .shunting
            .ok_or(RequestError::MissingParameters("shunting"))?;
        let maintenance = self
            .maintenance
            .ok_or(RequestError::MissingParameters("maintenance"))?;
        let costs = self.costs.ok_or(RequestError::MissingParameters("cost"))?;
        let (forbid_dead_head_trips, day_limit_threshold) = self
            .global
            .ok_or(RequestError::MissingParameters("global"))?;

        if let Some(depot) = self.depots.values().find(|d| d.allowed_types.is_empty()) {
            return Err(RequestError::DepotWithoutVehicleTypes(depot.id.clone()));
        }

        if let Some(vehicle_type) = self
            .vehicle_types
            .keys()
            .find(|vt| !self.depots.values().any(|d| d.supports(vt)))
        {
            return Err(RequestError::VehicleTypeWithoutDepot(vehicle_type.clone()));
        }

        for origin in self.locations.keys() {
            for destination in self.locations.keys() {
                if origin != destination && !self.trip_matrix.contains_relation(origin, destination)
                {
                    return Err(RequestError::MissingRelation {
                        origin: origin.clone(),
                        destination: destination.clone(),
                    });
                }
            }
        }

        Ok(Parameters {
            forbid_dead_head_trips,
            day_limit_threshold,
            shunting,
            maintenance,
            costs,
        })
    }
}

fn truncate_to_seconds(time: NaiveDateTime) -> NaiveDateTime {
    time.with_nanosecond(0).unwrap_or(time)
}

fn duplicate(kind: EntityKind, id: &str) -> RequestError {
    RequestError::Duplicate {
        kind,
        id: id.to_string(),
    }
}

fn not_found(kind: EntityKind, id: &str) -> RequestError {
    RequestError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn ensure_absent<V>(
    map: &BTreeMap<String, V>,
    kind: EntityKind,
    id: &str,
) -> Result<(), RequestError> {
    if map.contains_key(id) {
        return Err(duplicate(kind, id));
    }
    Ok(())
}

fn ensure_present<V>(
    map: &BTreeMap<String, V>,
    kind: EntityKind,
    id: &str,
) -> Result<(), RequestError> {
    if !map.contains_key(id) {
        return Err(not_found(kind, id));
    }
    Ok(())
}
