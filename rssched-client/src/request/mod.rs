//! The scheduling request document sent to the rolling stock solver.
//!
//! A [`Request`] can only be obtained from [`RequestBuilder::build`], which
//! checks referential integrity and global feasibility before sealing the
//! document. All collections of a built request are in a deterministic order.

mod builder;
mod error;
mod model;
mod parameters;
mod trip_matrix;

pub use builder::RequestBuilder;
pub use error::{EntityKind, RequestError};
pub use model::{
    AllowedType, Departure, DepartureSegment, Depot, Location, MaintenanceSlot, Route,
    RouteSegment, VehicleType,
};
pub use parameters::{CostParameters, MaintenanceParameters, Parameters, ShuntingParameters};
pub use trip_matrix::TripMatrix;

use serde::{Deserialize, Serialize};

/// A validated, immutable scheduling request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    vehicle_types: Vec<VehicleType>,
    locations: Vec<Location>,
    depots: Vec<Depot>,
    routes: Vec<Route>,
    departures: Vec<Departure>,
    maintenance_slots: Vec<MaintenanceSlot>,
    dead_head_trips: TripMatrix,
    parameters: Parameters,
}

impl Request {
    /// Start building a new request.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Sorted by id.
    pub fn vehicle_types(&self) -> &[VehicleType] {
        &self.vehicle_types
    }

    /// Sorted by id.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Sorted by id.
    pub fn depots(&self) -> &[Depot] {
        &self.depots
    }

    /// Sorted by id.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Sorted by earliest segment departure, ties by id.
    pub fn departures(&self) -> &[Departure] {
        &self.departures
    }

    /// Sorted by start, ties by id.
    pub fn maintenance_slots(&self) -> &[MaintenanceSlot] {
        &self.maintenance_slots
    }

    pub fn dead_head_trips(&self) -> &TripMatrix {
        &self.dead_head_trips
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read a request previously written with [`Request::to_json`].
    ///
    /// The document is trusted as-is; it is not validated again.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn costs() -> CostParameters {
        CostParameters {
            staff: 100,
            service_trip: 50,
            maintenance: 200,
            dead_head_trip: 75,
            idle: 25,
        }
    }

    fn with_parameters(builder: &mut RequestBuilder) {
        builder
            .set_shunting_parameters(60, 120, 180)
            .set_maintenance_parameters(15_000_000)
            .set_cost_parameters(costs())
            .set_global_parameters(false, 0);
    }

    /// Two locations, one route with one segment and one departure.
    fn scenario_a() -> RequestBuilder {
        let mut b = scenario_a_without_parameters();
        with_parameters(&mut b);
        b
    }

    fn scenario_a_without_parameters() -> RequestBuilder {
        let mut b = RequestBuilder::new();
        b.add_location("a")
            .unwrap()
            .add_location("b")
            .unwrap()
            .add_vehicle_type("vt", 200, 120, 3)
            .unwrap()
            .add_depot("dpt_a", "a", 999)
            .unwrap()
            .add_vehicle_type_to_depot("dpt_a", "vt", 999)
            .unwrap()
            .add_route("r", "vt")
            .unwrap()
            .add_segment_to_route("r_0", "r", "a", "b", 5000, 600)
            .unwrap()
            .add_departure("r_d", "r")
            .unwrap()
            .add_segment_to_departure("r_d_0", "r_d", "r_0", at(6, 0, 0), 80, 40)
            .unwrap()
            .add_dead_head_trip("a", "b", 500, 5100)
            .unwrap();
        b
    }

    /// Three locations, a two segment route and a few departures.
    fn two_segment_builder() -> RequestBuilder {
        let mut b = RequestBuilder::new();
        b.add_location("c").unwrap();
        b.add_location("a").unwrap();
        b.add_location_with_day_limit("b", 4).unwrap();
        b.add_vehicle_type("vt2", 300, 200, 2).unwrap();
        b.add_vehicle_type("vt1", 200, 120, 3).unwrap();
        b.add_depot("dpt_c", "c", 10).unwrap();
        b.add_depot("dpt_a", "a", 10).unwrap();
        b.add_vehicle_type_to_depot("dpt_a", "vt2", 5).unwrap();
        b.add_vehicle_type_to_depot("dpt_a", "vt1", 5).unwrap();
        b.add_vehicle_type_to_depot("dpt_c", "vt1", 5).unwrap();
        b.add_route("r2", "vt2").unwrap();
        b.add_route("r1", "vt1").unwrap();
        b.add_segment_to_route("r1_0", "r1", "a", "b", 1000, 600)
            .unwrap();
        b.add_segment_to_route_with_formation_limit("r1_1", "r1", "b", "c", 2000, 900, 1)
            .unwrap();
        b.add_segment_to_route("r2_0", "r2", "c", "a", 3000, 1200)
            .unwrap();
        b.add_departure("r1_late", "r1").unwrap();
        b.add_segment_to_departure("r1_late_0", "r1_late", "r1_0", at(9, 0, 0), 10, 5)
            .unwrap();
        b.add_segment_to_departure("r1_late_1", "r1_late", "r1_1", at(9, 10, 0), 12, 6)
            .unwrap();
        b.add_departure("r2_b", "r2").unwrap();
        b.add_segment_to_departure("r2_b_0", "r2_b", "r2_0", at(7, 0, 0), 1, 1)
            .unwrap();
        b.add_departure("r2_a", "r2").unwrap();
        b.add_segment_to_departure("r2_a_0", "r2_a", "r2_0", at(7, 0, 0), 2, 2)
            .unwrap();
        b.add_departure("r1_empty", "r1").unwrap();
        b.add_maintenance_slot("m2", "c", at(22, 0, 0), at(4, 0, 0), 1)
            .unwrap();
        b.add_maintenance_slot("m1", "a", at(23, 0, 0), at(23, 30, 0), 2)
            .unwrap();
        b.add_maintenance_slot("m0", "a", at(22, 0, 0), at(23, 0, 0), 2)
            .unwrap();
        for o in ["a", "b", "c"] {
            for d in ["a", "b", "c"] {
                if o != d {
                    b.add_dead_head_trip(o, d, 300, 3000).unwrap();
                }
            }
        }
        with_parameters(&mut b);
        b
    }

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<&str> {
        items.iter().map(id).collect()
    }

    #[test]
    fn scenario_a_builds() {
        let mut b = scenario_a();
        b.add_dead_head_trip("b", "a", 500, 5100).unwrap();
        let request = b.build().unwrap();

        let matrix = request.dead_head_trips();
        assert_eq!(matrix.indices(), ["a", "b"]);
        assert_eq!(matrix.durations(), [vec![0, 500], vec![500, 0]]);
        assert_eq!(matrix.distances(), [vec![0, 5100], vec![5100, 0]]);
        assert_eq!(request.parameters().costs, costs());
        assert_eq!(request.departures()[0].segments[0].departure, at(6, 0, 0));
    }

    #[test]
    fn scenario_b_missing_relation_fails() {
        let err = scenario_a().build().unwrap_err();
        assert_eq!(
            err,
            RequestError::MissingRelation {
                origin: "b".into(),
                destination: "a".into()
            }
        );
    }

    #[test]
    fn collections_are_sorted() {
        let request = two_segment_builder().build().unwrap();

        assert_eq!(ids(request.vehicle_types(), |v| v.id.as_str()), ["vt1", "vt2"]);
        assert_eq!(ids(request.locations(), |l| l.id.as_str()), ["a", "b", "c"]);
        assert_eq!(request.locations()[1].day_limit, Some(4));
        assert_eq!(ids(request.depots(), |d| d.id.as_str()), ["dpt_a", "dpt_c"]);
        assert_eq!(
            ids(&request.depots()[0].allowed_types, |t| t.vehicle_type.as_str()),
            ["vt1", "vt2"]
        );
        assert_eq!(ids(request.routes(), |r| r.id.as_str()), ["r1", "r2"]);
        assert_eq!(
            ids(&request.routes()[0].segments, |s| s.id.as_str()),
            ["r1_0", "r1_1"]
        );
        assert_eq!(request.routes()[0].segments[1].order, 1);
        assert_eq!(
            request.routes()[0].segments[1].maximal_formation_count,
            Some(1)
        );
        // equal start times fall back to the id, departures without segments go last
        assert_eq!(
            ids(request.departures(), |d| d.id.as_str()),
            ["r2_a", "r2_b", "r1_late", "r1_empty"]
        );
        assert_eq!(
            ids(request.maintenance_slots(), |m| m.id.as_str()),
            ["m0", "m2", "m1"]
        );
        assert_eq!(request.dead_head_trips().indices(), ["a", "b", "c"]);
    }

    #[test]
    fn overnight_maintenance_slot_ends_next_day() {
        let request = two_segment_builder().build().unwrap();
        let slot = request
            .maintenance_slots()
            .iter()
            .find(|m| m.id == "m2")
            .unwrap();
        assert_eq!(slot.start, at(22, 0, 0));
        assert_eq!(
            slot.end,
            NaiveDate::from_ymd_opt(2020, 1, 2)
                .unwrap()
                .and_hms_opt(4, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn departure_at_previous_arrival_is_accepted() {
        let mut b = scenario_a();
        b.add_location("c").unwrap();
        b.add_segment_to_route("r_1", "r", "b", "c", 1000, 300)
            .unwrap();
        // r_0 departs 06:00 and takes 600 s
        b.add_segment_to_departure("r_d_1", "r_d", "r_1", at(6, 10, 0), 80, 40)
            .unwrap();
    }

    #[test]
    fn departure_before_previous_arrival_is_rejected() {
        let mut b = scenario_a();
        b.add_location("c").unwrap();
        b.add_segment_to_route("r_1", "r", "b", "c", 1000, 300)
            .unwrap();
        let err = b
            .add_segment_to_departure("r_d_1", "r_d", "r_1", at(6, 9, 59), 80, 40)
            .unwrap_err();
        assert_eq!(
            err,
            RequestError::DepartureBeforeArrival {
                segment: "r_d_1".into(),
                route_segment: "r_1".into(),
                departure_time: at(6, 9, 59),
                previous_segment: "r_d_0".into(),
                previous_route_segment: "r_0".into(),
                arrival_time: at(6, 10, 0),
            }
        );
    }

    #[test]
    fn departure_time_is_truncated_to_seconds() {
        let mut b = scenario_a();
        b.add_departure("r_e", "r").unwrap();
        let time = at(7, 0, 0) + chrono::Duration::milliseconds(750);
        b.add_segment_to_departure("r_e_0", "r_e", "r_0", time, 1, 1)
            .unwrap();
        b.add_dead_head_trip("b", "a", 500, 5100).unwrap();

        let request = b.build().unwrap();
        let departure = request
            .departures()
            .iter()
            .find(|d| d.id == "r_e")
            .unwrap();
        assert_eq!(departure.segments[0].departure, at(7, 0, 0));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut b = scenario_a();
        assert_eq!(
            b.add_location("a").unwrap_err(),
            RequestError::Duplicate {
                kind: EntityKind::Location,
                id: "a".into()
            }
        );
        assert!(matches!(
            b.add_vehicle_type("vt", 1, 1, 1),
            Err(RequestError::Duplicate {
                kind: EntityKind::VehicleType,
                ..
            })
        ));
        assert!(matches!(
            b.add_route("r", "vt"),
            Err(RequestError::Duplicate {
                kind: EntityKind::Route,
                ..
            })
        ));
        assert!(matches!(
            b.add_segment_to_route("r_0", "r", "a", "b", 1, 1),
            Err(RequestError::Duplicate {
                kind: EntityKind::RouteSegment,
                ..
            })
        ));
        assert!(matches!(
            b.add_departure("r_d", "r"),
            Err(RequestError::Duplicate {
                kind: EntityKind::Departure,
                ..
            })
        ));
        assert_eq!(
            b.add_vehicle_type_to_depot("dpt_a", "vt", 1).unwrap_err(),
            RequestError::DuplicateAllowedType {
                depot: "dpt_a".into(),
                vehicle_type: "vt".into()
            }
        );
    }

    #[test]
    fn unknown_references_are_rejected() {
        let mut b = scenario_a();
        assert_eq!(
            b.add_depot("dpt_x", "x", 1).unwrap_err(),
            RequestError::NotFound {
                kind: EntityKind::Location,
                id: "x".into()
            }
        );
        assert!(matches!(
            b.add_route("r_x", "vt_x"),
            Err(RequestError::NotFound {
                kind: EntityKind::VehicleType,
                ..
            })
        ));
        assert!(matches!(
            b.add_vehicle_type_to_depot("dpt_x", "vt", 1),
            Err(RequestError::NotFound {
                kind: EntityKind::Depot,
                ..
            })
        ));
        assert!(matches!(
            b.add_segment_to_route("r_9", "r_x", "a", "b", 1, 1),
            Err(RequestError::NotFound {
                kind: EntityKind::Route,
                ..
            })
        ));
        assert!(matches!(
            b.add_segment_to_departure("x_0", "r_d", "r_9", at(8, 0, 0), 0, 0),
            Err(RequestError::NotFound {
                kind: EntityKind::RouteSegment,
                ..
            })
        ));
        assert!(matches!(
            b.add_maintenance_slot("m", "x", at(1, 0, 0), at(2, 0, 0), 1),
            Err(RequestError::NotFound {
                kind: EntityKind::Location,
                ..
            })
        ));
        assert!(matches!(
            b.add_dead_head_trip("a", "x", 1, 1),
            Err(RequestError::NotFound {
                kind: EntityKind::Location,
                ..
            })
        ));
        assert_eq!(
            b.add_dead_head_trip("", "a", 1, 1).unwrap_err(),
            RequestError::EmptyLocationId
        );
    }

    #[test]
    fn route_segment_must_match_departure_position() {
        let mut b = scenario_a();
        b.add_location("c").unwrap();
        b.add_segment_to_route("r_1", "r", "b", "c", 1000, 300)
            .unwrap();
        b.add_departure("r_e", "r").unwrap();

        assert_eq!(
            b.add_segment_to_departure("r_e_0", "r_e", "r_1", at(8, 0, 0), 0, 0)
                .unwrap_err(),
            RequestError::SegmentNotOnRoute {
                route_segment: "r_1".into(),
                position: 0,
                route: "r".into(),
                departure: "r_e".into(),
            }
        );

        assert_eq!(
            b.add_segment_to_departure("r_d_1", "r_d", "r_0", at(8, 0, 0), 0, 0)
                .unwrap_err(),
            RequestError::DuplicateRouteSegment {
                route_segment: "r_0".into(),
                departure: "r_d".into(),
            }
        );
    }

    #[test]
    fn segment_of_other_route_is_rejected() {
        let mut b = scenario_a();
        b.add_route("q", "vt").unwrap();
        b.add_segment_to_route("q_0", "q", "b", "a", 5000, 600)
            .unwrap();
        b.add_departure("r_e", "r").unwrap();
        assert!(matches!(
            b.add_segment_to_departure("r_e_0", "r_e", "q_0", at(8, 0, 0), 0, 0),
            Err(RequestError::SegmentNotOnRoute { position: 0, .. })
        ));
    }

    #[test]
    fn build_checks_in_order() {
        assert_eq!(
            RequestBuilder::new().build().unwrap_err(),
            RequestError::Empty(EntityKind::VehicleType)
        );

        let mut b = RequestBuilder::new();
        b.add_vehicle_type("vt", 1, 1, 1).unwrap();
        assert_eq!(
            b.build().unwrap_err(),
            RequestError::Empty(EntityKind::Location)
        );

        let mut b = scenario_a_without_parameters();
        b.add_dead_head_trip("b", "a", 1, 1).unwrap();
        b.set_maintenance_parameters(1)
            .set_cost_parameters(costs())
            .set_global_parameters(true, 0);
        assert_eq!(
            b.build().unwrap_err(),
            RequestError::MissingParameters("shunting")
        );

        let mut b = scenario_a();
        b.add_dead_head_trip("b", "a", 1, 1).unwrap();
        b.add_depot("dpt_b", "b", 1).unwrap();
        assert_eq!(
            b.build().unwrap_err(),
            RequestError::DepotWithoutVehicleTypes("dpt_b".into())
        );

        let mut b = scenario_a();
        b.add_dead_head_trip("b", "a", 1, 1).unwrap();
        b.add_vehicle_type("vt_orphan", 1, 1, 1).unwrap();
        assert_eq!(
            b.build().unwrap_err(),
            RequestError::VehicleTypeWithoutDepot("vt_orphan".into())
        );
    }

    #[test]
    fn json_round_trip() {
        let request = two_segment_builder().build().unwrap();
        let json = request.to_json().unwrap();
        assert!(json.contains("\"deadHeadTrips\""));
        assert!(json.contains("\"maximalFormationCount\""));
        assert!(json.contains("\"forbidDeadHeadTrips\""));

        let parsed = Request::from_json(&json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn same_calls_build_same_document() {
        let first = two_segment_builder().build().unwrap();
        let second = two_segment_builder().build().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    mod proptests {
        use std::collections::BTreeSet;

        use proptest::prelude::*;

        use super::*;

        fn build_from(locations: &BTreeSet<String>, offsets: &[u32]) -> Request {
            let mut b = RequestBuilder::new();
            for l in locations {
                b.add_location(l).unwrap();
            }
            let ordered: Vec<&String> = locations.iter().collect();
            let first = ordered[0];
            let second = ordered[1];
            b.add_vehicle_type("vt", 10, 5, 2).unwrap();
            b.add_depot("dpt", first, 5).unwrap();
            b.add_vehicle_type_to_depot("dpt", "vt", 5).unwrap();
            b.add_route("r", "vt").unwrap();
            b.add_segment_to_route("r_0", "r", first, second, 100, 60)
                .unwrap();
            for (i, offset) in offsets.iter().enumerate() {
                let id = format!("r_{i}");
                b.add_departure(&id, "r").unwrap();
                let time = at(0, 0, 0) + chrono::Duration::seconds(i64::from(*offset));
                b.add_segment_to_departure(&format!("{id}_0"), &id, "r_0", time, 1, 1)
                    .unwrap();
            }
            for o in locations {
                for d in locations {
                    if o != d {
                        b.add_dead_head_trip(o, d, 60, 100).unwrap();
                    }
                }
            }
            with_parameters(&mut b);
            b.build().unwrap()
        }

        proptest! {
            #[test]
            fn built_documents_are_consistent(
                locations in prop::collection::btree_set("[a-z]{1,4}", 2..6),
                offsets in prop::collection::vec(0u32..86_400, 1..8),
            ) {
                let request = build_from(&locations, &offsets);

                // matrix covers every location, zero diagonal
                let matrix = request.dead_head_trips();
                let expected: Vec<&String> = locations.iter().collect();
                prop_assert_eq!(matrix.indices().iter().collect::<Vec<_>>(), expected);
                for (i, row) in matrix.durations().iter().enumerate() {
                    prop_assert_eq!(row.len(), locations.len());
                    prop_assert_eq!(row[i], 0);
                }

                // departures sorted by start, then id
                for pair in request.departures().windows(2) {
                    let a = (pair[0].earliest_departure(), &pair[0].id);
                    let b = (pair[1].earliest_departure(), &pair[1].id);
                    prop_assert!(a <= b);
                }

                // idempotent and round-trips through JSON
                let again = build_from(&locations, &offsets);
                prop_assert_eq!(&again, &request);
                let parsed = Request::from_json(&request.to_json().unwrap()).unwrap();
                prop_assert_eq!(parsed, request);
            }
        }
    }
}
