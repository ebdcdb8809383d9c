//! Passenger counts from a simulation event stream.
//!
//! Every vehicle starting a departure on a line of interest gets a tracker
//! that follows it stop by stop. Each departure from a stop emits an
//! [`Entry`] with the access, egress and on-board counts of that stop.
//! Passengers riding longer than the seat duration threshold are counted as
//! seated on every entry of their ride.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, trace};

use crate::scenario::{Scenario, TransitRoute};

use super::events::Event;

/// Errors when the event stream contradicts the timetable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("route {route} of line {line} not found in timetable")]
    UnknownRoute { line: String, route: String },

    #[error("departure {departure} not found on route {route}")]
    UnknownDeparture { route: String, departure: String },

    #[error("vehicle {vehicle} starts a new departure with {passengers} passengers on board")]
    PassengersOnBoard { vehicle: String, passengers: u32 },

    #[error("vehicle {vehicle} arrived at {actual}, expected {expected}")]
    UnexpectedStop {
        vehicle: String,
        expected: String,
        actual: String,
    },

    #[error("vehicle {vehicle} arrived at {facility} after the last stop of route {route}")]
    PastTerminal {
        vehicle: String,
        facility: String,
        route: String,
    },

    #[error("vehicle {vehicle} departs before arriving at the first stop")]
    DepartureBeforeArrival { vehicle: String },

    #[error("driver of vehicle {vehicle} left before the last stop of route {route}")]
    DriverLeftEarly { vehicle: String, route: String },

    #[error("person {person} leaves vehicle {vehicle} without having entered")]
    MissingAccess { person: String, vehicle: String },
}

/// Counts of one departure of a vehicle from one stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub line: String,
    pub route: String,
    pub departure: String,
    /// Position of `from_stop` in the route.
    pub stop_index: usize,
    pub from_stop: String,
    /// `None` when departing from the last stop.
    pub to_stop: Option<String>,
    pub egress: u32,
    pub access: u32,
    /// On board between `from_stop` and `to_stop`.
    pub passengers: u32,
    pub seats: u32,
}

/// Access of a passenger: when, and how many entries the vehicle's tracker
/// had emitted at that time.
#[derive(Debug, Clone, Copy)]
struct Access {
    time: f64,
    position: usize,
}

#[derive(Debug)]
struct Tracker<'a> {
    driver: String,
    line: String,
    route: &'a TransitRoute,
    departure: String,
    /// Stop the vehicle is at or last departed from. `None` before the
    /// first arrival.
    stop_index: Option<usize>,
    passengers: u32,
    access: u32,
    egress: u32,
    /// Indices into the analysis' entries emitted by this tracker.
    emitted: Vec<usize>,
}

impl Tracker<'_> {
    fn at_terminal(&self) -> bool {
        self.stop_index
            .is_some_and(|i| i + 1 == self.route.stops.len())
    }
}

/// Single pass reducer over an ordered event stream.
#[derive(Debug)]
pub struct PassengerAnalysis<'a> {
    scenario: &'a Scenario,
    lines: BTreeSet<String>,
    sample_size_factor: f64,
    seat_duration_threshold: f64,
    entries: Vec<Entry>,
    trackers: HashMap<String, Tracker<'a>>,
    accesses: HashMap<String, Access>,
}

impl<'a> PassengerAnalysis<'a> {
    /// Analyse vehicles serving `lines`.
    ///
    /// Counts are scaled by `1 / sample_size`. Passengers riding longer than
    /// `seat_duration_threshold` seconds are counted as seated.
    pub fn new(
        scenario: &'a Scenario,
        lines: BTreeSet<String>,
        sample_size: f64,
        seat_duration_threshold: u32,
    ) -> Self {
        Self {
            scenario,
            lines,
            sample_size_factor: 1.0 / sample_size,
            seat_duration_threshold: f64::from(seat_duration_threshold),
            entries: Vec::new(),
            trackers: HashMap::new(),
            accesses: HashMap::new(),
        }
    }

    /// Entries emitted so far, in emission order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Number of vehicles currently on a departure of interest.
    pub fn active_vehicles(&self) -> usize {
        self.trackers.len()
    }

    /// Process all events in order.
    pub fn run<'e>(
        &mut self,
        events: impl IntoIterator<Item = &'e Event>,
    ) -> Result<(), AnalysisError> {
        for event in events {
            self.handle(event)?;
        }
        Ok(())
    }

    /// Process one event.
    pub fn handle(&mut self, event: &Event) -> Result<(), AnalysisError> {
        match event {
            Event::TransitDriverStarts {
                time,
                driver,
                vehicle,
                line,
                route,
                departure,
            } => self.start(*time, driver, vehicle, line, route, departure),
            Event::VehicleArrivesAtFacility {
                vehicle, facility, ..
            } => self.arrive(vehicle, facility),
            Event::VehicleDepartsAtFacility { vehicle, .. } => self.depart(vehicle),
            Event::PersonEntersVehicle {
                time,
                person,
                vehicle,
            } => {
                self.enter(*time, person, vehicle);
                Ok(())
            }
            Event::PersonLeavesVehicle {
                time,
                person,
                vehicle,
            } => self.leave(*time, person, vehicle),
            Event::Other => Ok(()),
        }
    }

    fn start(
        &mut self,
        time: f64,
        driver: &str,
        vehicle: &str,
        line: &str,
        route: &str,
        departure: &str,
    ) -> Result<(), AnalysisError> {
        if !self.lines.contains(line) || !self.scenario.vehicles.contains_vehicle(vehicle) {
            return Ok(());
        }
        let transit_route = self
            .scenario
            .timetable
            .route(line, route)
            .ok_or_else(|| AnalysisError::UnknownRoute {
                line: line.to_string(),
                route: route.to_string(),
            })?;
        if transit_route.departure(departure).is_none() {
            return Err(AnalysisError::UnknownDeparture {
                route: route.to_string(),
                departure: departure.to_string(),
            });
        }
        if let Some(previous) = self.trackers.get(vehicle)
            && previous.passengers > 0
        {
            return Err(AnalysisError::PassengersOnBoard {
                vehicle: vehicle.to_string(),
                passengers: previous.passengers,
            });
        }

        self.trackers.insert(
            vehicle.to_string(),
            Tracker {
                driver: driver.to_string(),
                line: line.to_string(),
                route: transit_route,
                departure: departure.to_string(),
                stop_index: None,
                passengers: 0,
                access: 0,
                egress: 0,
                emitted: Vec::new(),
            },
        );
        debug!(
            vehicle,
            line,
            route,
            departure,
            time,
            active = self.trackers.len(),
            "Registered departure of transit vehicle"
        );
        Ok(())
    }

    fn arrive(&mut self, vehicle: &str, facility: &str) -> Result<(), AnalysisError> {
        let Some(tracker) = self.trackers.get_mut(vehicle) else {
            return Ok(());
        };
        let next = tracker.stop_index.map_or(0, |i| i + 1);
        let Some(expected) = tracker.route.stops.get(next) else {
            return Err(AnalysisError::PastTerminal {
                vehicle: vehicle.to_string(),
                facility: facility.to_string(),
                route: tracker.route.id.clone(),
            });
        };
        if expected.facility != facility {
            return Err(AnalysisError::UnexpectedStop {
                vehicle: vehicle.to_string(),
                expected: expected.facility.clone(),
                actual: facility.to_string(),
            });
        }
        tracker.stop_index = Some(next);
        tracker.access = 0;
        tracker.egress = 0;
        Ok(())
    }

    fn depart(&mut self, vehicle: &str) -> Result<(), AnalysisError> {
        let Some(tracker) = self.trackers.get_mut(vehicle) else {
            return Ok(());
        };
        let Some(stop_index) = tracker.stop_index else {
            return Err(AnalysisError::DepartureBeforeArrival {
                vehicle: vehicle.to_string(),
            });
        };

        let stops = &tracker.route.stops;
        let factor = self.sample_size_factor;
        let entry = Entry {
            line: tracker.line.clone(),
            route: tracker.route.id.clone(),
            departure: tracker.departure.clone(),
            stop_index,
            from_stop: stops[stop_index].facility.clone(),
            to_stop: stops.get(stop_index + 1).map(|s| s.facility.clone()),
            egress: scale(tracker.egress, factor),
            access: scale(tracker.access, factor),
            passengers: scale(tracker.passengers, factor),
            seats: 0,
        };
        trace!(vehicle, stop = %entry.from_stop, passengers = entry.passengers, "Vehicle departs");

        tracker.emitted.push(self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    fn enter(&mut self, time: f64, person: &str, vehicle: &str) {
        let Some(tracker) = self.trackers.get_mut(vehicle) else {
            return;
        };
        if tracker.driver == person {
            return;
        }
        tracker.access += 1;
        tracker.passengers += 1;
        self.accesses.insert(
            person.to_string(),
            Access {
                time,
                position: tracker.emitted.len(),
            },
        );
    }

    fn leave(&mut self, time: f64, person: &str, vehicle: &str) -> Result<(), AnalysisError> {
        let Some(tracker) = self.trackers.get_mut(vehicle) else {
            return Ok(());
        };

        if tracker.driver == person {
            if !tracker.at_terminal() {
                return Err(AnalysisError::DriverLeftEarly {
                    vehicle: vehicle.to_string(),
                    route: tracker.route.id.clone(),
                });
            }
            self.trackers.remove(vehicle);
            debug!(vehicle, active = self.trackers.len(), "Deactivated transit vehicle");
            return Ok(());
        }

        tracker.egress += 1;
        tracker.passengers = tracker.passengers.saturating_sub(1);
        let access = self
            .accesses
            .remove(person)
            .ok_or_else(|| AnalysisError::MissingAccess {
                person: person.to_string(),
                vehicle: vehicle.to_string(),
            })?;

        if time - access.time > self.seat_duration_threshold {
            // truncated so that summed seats never exceed the rounded passengers
            let seats = self.sample_size_factor as u32;
            for &index in tracker.emitted.iter().skip(access.position) {
                self.entries[index].seats += seats;
            }
        }
        Ok(())
    }
}

fn scale(count: u32, factor: f64) -> u32 {
    (f64::from(count) * factor).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{
        Network, StopFacility, Timetable, TransitDeparture, TransitLine, TransitRouteStop,
        VehicleRegistry,
    };

    fn stop(facility: &str, arrival: Option<f64>, departure: Option<f64>) -> TransitRouteStop {
        TransitRouteStop {
            facility: facility.into(),
            arrival_offset: arrival,
            departure_offset: departure,
        }
    }

    /// Line L with route R over stops A, B, C, served by vehicle v.
    fn scenario() -> Scenario {
        let route = TransitRoute {
            id: "R".into(),
            stops: vec![
                stop("A", None, Some(0.0)),
                stop("B", Some(600.0), Some(660.0)),
                stop("C", Some(1200.0), None),
            ],
            link_ids: vec![],
            departures: vec![TransitDeparture {
                id: "D1".into(),
                vehicle: "v".into(),
                departure_time: 21_600.0,
            }],
        };
        let mut timetable = Timetable {
            lines: vec![TransitLine {
                id: "L".into(),
                routes: vec![route],
            }],
            ..Timetable::default()
        };
        for id in ["A", "B", "C"] {
            timetable.facilities.insert(
                id.into(),
                StopFacility {
                    name: id.to_lowercase(),
                    link: format!("l{id}"),
                },
            );
        }
        let mut vehicles = VehicleRegistry::default();
        vehicles.vehicles.insert("v".into(), "vt".into());
        vehicles.vehicles.insert("w".into(), "vt".into());
        Scenario {
            network: Network::default(),
            timetable,
            vehicles,
        }
    }

    fn lines() -> BTreeSet<String> {
        BTreeSet::from(["L".to_string()])
    }

    fn starts(vehicle: &str, line: &str) -> Event {
        Event::TransitDriverStarts {
            time: 21_500.0,
            driver: "pt_driver".into(),
            vehicle: vehicle.into(),
            line: line.into(),
            route: "R".into(),
            departure: "D1".into(),
        }
    }

    fn arrives(time: f64, facility: &str) -> Event {
        Event::VehicleArrivesAtFacility {
            time,
            vehicle: "v".into(),
            facility: facility.into(),
        }
    }

    fn departs(time: f64, facility: &str) -> Event {
        Event::VehicleDepartsAtFacility {
            time,
            vehicle: "v".into(),
            facility: facility.into(),
        }
    }

    fn enters(time: f64, person: &str) -> Event {
        Event::PersonEntersVehicle {
            time,
            person: person.into(),
            vehicle: "v".into(),
        }
    }

    fn leaves(time: f64, person: &str) -> Event {
        Event::PersonLeavesVehicle {
            time,
            person: person.into(),
            vehicle: "v".into(),
        }
    }

    /// Full trip where p1 rides A to C and p2 rides A to B.
    fn full_trip() -> Vec<Event> {
        vec![
            starts("v", "L"),
            enters(21_500.0, "pt_driver"),
            arrives(21_590.0, "A"),
            enters(21_595.0, "p1"),
            enters(21_596.0, "p2"),
            departs(21_600.0, "A"),
            arrives(22_200.0, "B"),
            leaves(22_210.0, "p2"),
            departs(22_260.0, "B"),
            arrives(22_800.0, "C"),
            leaves(22_810.0, "p1"),
            departs(22_820.0, "C"),
            leaves(22_830.0, "pt_driver"),
        ]
    }

    #[test]
    fn long_ride_counts_seat_on_every_entry() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
        analysis.run(&full_trip()).unwrap();

        let entries = analysis.entries();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].from_stop, "A");
        assert_eq!(entries[0].to_stop.as_deref(), Some("B"));
        assert_eq!((entries[0].access, entries[0].egress), (2, 0));
        assert_eq!(entries[0].passengers, 2);

        assert_eq!(entries[1].from_stop, "B");
        assert_eq!((entries[1].access, entries[1].egress), (0, 1));
        assert_eq!(entries[1].passengers, 1);

        assert_eq!(entries[2].from_stop, "C");
        assert_eq!(entries[2].to_stop, None);
        assert_eq!(entries[2].passengers, 0);
        assert_eq!(entries[2].stop_index, 2);

        // p1 rode 1215 s and is seated on A-B and B-C. p2 rode 614 s.
        let seats: Vec<u32> = entries.iter().map(|e| e.seats).collect();
        assert_eq!(seats, [1, 1, 0]);
        assert_eq!(analysis.active_vehicles(), 0);
    }

    #[test]
    fn counts_are_scaled_by_sample_size() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 0.1, 900);
        analysis.run(&full_trip()).unwrap();

        let entries = analysis.into_entries();
        assert_eq!(entries[0].passengers, 20);
        assert_eq!(entries[0].access, 20);
        assert_eq!(entries[1].egress, 10);
        assert_eq!(entries[0].seats, 10);
    }

    #[test]
    fn fractional_scale_keeps_seats_within_passengers() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 0.4, 900);
        let mut events = full_trip();
        // p2 stays on to C as well
        let early = events
            .iter()
            .position(|e| *e == leaves(22_210.0, "p2"))
            .unwrap();
        events.remove(early);
        let late = events
            .iter()
            .position(|e| *e == leaves(22_810.0, "p1"))
            .unwrap();
        events.insert(late + 1, leaves(22_811.0, "p2"));
        analysis.run(&events).unwrap();

        let entries = analysis.entries();
        assert_eq!(entries[0].passengers, 5);
        assert_eq!(entries[1].passengers, 5);
        assert_eq!(entries[0].seats, 4);
        assert_eq!(entries[1].seats, 4);
        for entry in entries {
            assert!(entry.seats <= entry.passengers);
        }
    }

    #[test]
    fn ignores_other_lines_and_unknown_vehicles() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
        analysis
            .run(&[
                starts("v", "M"),
                starts("unknown", "L"),
                arrives(21_590.0, "A"),
                departs(21_600.0, "A"),
                Event::Other,
            ])
            .unwrap();
        assert!(analysis.entries().is_empty());
        assert_eq!(analysis.active_vehicles(), 0);
    }

    #[test]
    fn wrong_stop_is_fatal() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
        let err = analysis
            .run(&[starts("v", "L"), arrives(21_590.0, "B")])
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UnexpectedStop {
                vehicle: "v".into(),
                expected: "A".into(),
                actual: "B".into(),
            }
        );
    }

    #[test]
    fn arrival_past_terminal_is_fatal() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
        let err = analysis
            .run(&[
                starts("v", "L"),
                arrives(1.0, "A"),
                arrives(2.0, "B"),
                arrives(3.0, "C"),
                arrives(4.0, "C"),
            ])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::PastTerminal { .. }));
    }

    #[test]
    fn departure_before_first_arrival_is_fatal() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
        let err = analysis
            .run(&[starts("v", "L"), departs(1.0, "A")])
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::DepartureBeforeArrival {
                vehicle: "v".into()
            }
        );
    }

    #[test]
    fn driver_leaving_early_is_fatal() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
        let err = analysis
            .run(&[starts("v", "L"), arrives(1.0, "A"), leaves(2.0, "pt_driver")])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DriverLeftEarly { .. }));
    }

    #[test]
    fn leaving_without_access_is_fatal() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
        let err = analysis
            .run(&[starts("v", "L"), arrives(1.0, "A"), leaves(2.0, "ghost")])
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MissingAccess {
                person: "ghost".into(),
                vehicle: "v".into()
            }
        );
    }

    #[test]
    fn restart_with_passengers_on_board_is_fatal() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
        let err = analysis
            .run(&[
                starts("v", "L"),
                arrives(1.0, "A"),
                enters(2.0, "p1"),
                starts("v", "L"),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::PassengersOnBoard {
                vehicle: "v".into(),
                passengers: 1
            }
        );
    }

    #[test]
    fn unknown_route_is_fatal() {
        let scenario = scenario();
        let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
        let err = analysis
            .handle(&Event::TransitDriverStarts {
                time: 0.0,
                driver: "d".into(),
                vehicle: "v".into(),
                line: "L".into(),
                route: "R9".into(),
                departure: "D1".into(),
            })
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownRoute { .. }));
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Random boardings at A and alightings at B or C keep the
            /// on-board count consistent with access and egress.
            #[test]
            fn on_board_matches_access_minus_egress(
                riders in prop::collection::vec(any::<bool>(), 0..20),
            ) {
                let scenario = scenario();
                let mut events = vec![starts("v", "L"), arrives(21_590.0, "A")];
                for i in 0..riders.len() {
                    events.push(enters(21_595.0, &format!("p{i}")));
                }
                events.push(departs(21_600.0, "A"));
                events.push(arrives(22_200.0, "B"));
                for (i, _) in riders.iter().enumerate().filter(|(_, b)| **b) {
                    events.push(leaves(22_210.0, &format!("p{i}")));
                }
                events.push(departs(22_260.0, "B"));
                events.push(arrives(22_800.0, "C"));
                for (i, _) in riders.iter().enumerate().filter(|(_, b)| !**b) {
                    events.push(leaves(22_810.0, &format!("p{i}")));
                }
                events.push(departs(22_820.0, "C"));
                events.push(leaves(22_830.0, "pt_driver"));

                let mut analysis = PassengerAnalysis::new(&scenario, lines(), 1.0, 900);
                analysis.run(&events).unwrap();
                let entries = analysis.entries();

                let total = riders.len() as u32;
                let at_b = riders.iter().filter(|b| **b).count() as u32;
                prop_assert_eq!(entries[0].passengers, total);
                prop_assert_eq!(entries[1].egress, at_b);
                prop_assert_eq!(entries[1].passengers, total - at_b);
                prop_assert_eq!(entries[2].egress, total - at_b);
                // only riders to C exceed the seat threshold
                prop_assert_eq!(entries[0].seats, total - at_b);
                prop_assert_eq!(entries[1].seats, total - at_b);
                prop_assert_eq!(entries[2].seats, 0);
            }
        }
    }
}
