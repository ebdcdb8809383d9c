//! Splitting transit routes into segments and measuring them.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::passenger::PassengerCount;
use crate::scenario::{Scenario, TransitRoute, TransitRouteStop};

use super::ComposeError;

/// Part of a route between two stops where shunting is possible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<'a> {
    pub origin: &'a TransitRouteStop,
    pub destination: &'a TransitRouteStop,
}

/// Split a route at its last stop and at every stop in `on_route_locations`.
pub fn collect_segments<'a>(
    route: &'a TransitRoute,
    on_route_locations: &BTreeSet<String>,
) -> Result<Vec<Segment<'a>>, ComposeError> {
    if route.stops.len() < 2 {
        return Err(ComposeError::TooFewStops(route.id.clone()));
    }
    let last = route.stops.len() - 1;

    let mut segments = Vec::new();
    let mut origin = &route.stops[0];
    for (i, stop) in route.stops.iter().enumerate().skip(1) {
        if i == last || on_route_locations.contains(&stop.facility) {
            segments.push(Segment {
                origin,
                destination: stop,
            });
            origin = stop;
        }
    }
    Ok(segments)
}

/// Length in meters of the route's links between the access links of the
/// segment's stops.
///
/// The route's link sequence usually omits the access link of its first
/// stop. When the origin link is not part of the sequence, counting starts
/// with the first link.
pub fn extract_distance(
    scenario: &Scenario,
    route: &TransitRoute,
    segment: &Segment<'_>,
) -> Result<u32, ComposeError> {
    let link_of = |stop: &TransitRouteStop| {
        scenario
            .timetable
            .facility(&stop.facility)
            .map(|f| f.link.as_str())
            .ok_or_else(|| ComposeError::UnknownFacility(stop.facility.clone()))
    };
    let from = link_of(segment.origin)?;
    let to = link_of(segment.destination)?;

    let mut counting = !route.link_ids.iter().any(|l| l == from);
    let mut distance = 0.0;
    for link in &route.link_ids {
        if link == to {
            break;
        }
        if counting {
            distance += scenario
                .network
                .link(link)
                .ok_or_else(|| ComposeError::UnknownLink(link.clone()))?
                .length;
        }
        if link == from {
            counting = true;
        }
    }
    Ok(round(distance))
}

/// Seconds from departing the origin to arriving at the destination.
pub fn extract_duration(segment: &Segment<'_>) -> u32 {
    round(segment.destination.arrival_or_departure() - segment.origin.departure_or_arrival())
}

/// Maximum passengers and seats on the legs of a departure covering the
/// segment. Zero when there are no observations.
pub fn extract_passengers(counts: &[PassengerCount], segment: &Segment<'_>) -> (u32, u32) {
    let mut passengers = 0;
    let mut seats = 0;
    let mut counting = false;
    for leg in counts {
        if leg.from_stop == segment.origin.facility {
            counting = true;
        }
        if counting {
            passengers = passengers.max(leg.passengers);
            seats = seats.max(leg.seats);
        }
        if leg.to_stop.as_deref() == Some(segment.destination.facility.as_str()) {
            break;
        }
    }
    (passengers, seats)
}

/// The vehicle type used by most departures of a route.
///
/// Ties go to the smallest type id. Mixed types are logged but accepted.
pub fn resolve_vehicle_type<'s>(
    scenario: &'s Scenario,
    route: &TransitRoute,
) -> Result<&'s str, ComposeError> {
    let mut frequencies: BTreeMap<&str, usize> = BTreeMap::new();
    for departure in &route.departures {
        let vehicle_type =
            scenario
                .vehicle_type_of(departure)
                .ok_or_else(|| ComposeError::UnknownVehicle {
                    vehicle: departure.vehicle.clone(),
                    route: route.id.clone(),
                })?;
        *frequencies.entry(vehicle_type).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (&vehicle_type, &count) in &frequencies {
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((vehicle_type, count));
        }
    }
    let (vehicle_type, _) = best.ok_or_else(|| ComposeError::NoDepartures(route.id.clone()))?;

    if frequencies.len() > 1 {
        warn!(
            route = %route.id,
            types = ?frequencies.keys().collect::<Vec<_>>(),
            chosen = vehicle_type,
            "Vehicle types are not unique on route, using the most frequent"
        );
    }
    Ok(vehicle_type)
}

fn round(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}
