//! Transit timetable: stop facilities, lines, routes and departures.
//!
//! Times are seconds. Stop offsets are relative to the start of a departure,
//! departure start times are seconds after midnight and may exceed one day.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A stop facility, attached to the network through its access link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopFacility {
    #[serde(default)]
    pub name: String,
    pub link: String,
}

/// A stop of a transit route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitRouteStop {
    pub facility: String,
    /// Undefined at the first stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_offset: Option<f64>,
    /// Undefined at the last stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_offset: Option<f64>,
}

impl TransitRouteStop {
    /// Departure offset, falling back to the arrival offset.
    pub fn departure_or_arrival(&self) -> f64 {
        self.departure_offset.or(self.arrival_offset).unwrap_or(0.0)
    }

    /// Arrival offset, falling back to the departure offset.
    pub fn arrival_or_departure(&self) -> f64 {
        self.arrival_offset.or(self.departure_offset).unwrap_or(0.0)
    }
}

/// One trip of a vehicle along a transit route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitDeparture {
    pub id: String,
    pub vehicle: String,
    /// Seconds after midnight.
    pub departure_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitRoute {
    pub id: String,
    pub stops: Vec<TransitRouteStop>,
    /// Network links traversed between the first and the last stop. The
    /// access links of the terminal stops are usually not included.
    #[serde(default)]
    pub link_ids: Vec<String>,
    #[serde(default)]
    pub departures: Vec<TransitDeparture>,
}

impl TransitRoute {
    pub fn departure(&self, id: &str) -> Option<&TransitDeparture> {
        self.departures.iter().find(|d| d.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitLine {
    pub id: String,
    pub routes: Vec<TransitRoute>,
}

impl TransitLine {
    pub fn route(&self, id: &str) -> Option<&TransitRoute> {
        self.routes.iter().find(|r| r.id == id)
    }
}

/// The transit schedule of a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub facilities: BTreeMap<String, StopFacility>,
    pub lines: Vec<TransitLine>,
}

impl Timetable {
    pub fn facility(&self, id: &str) -> Option<&StopFacility> {
        self.facilities.get(id)
    }

    pub fn line(&self, id: &str) -> Option<&TransitLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Look up a route by line and route id.
    pub fn route(&self, line: &str, route: &str) -> Option<&TransitRoute> {
        self.line(line).and_then(|l| l.route(route))
    }
}
