//! Passenger observations grouped per departure.

use std::collections::BTreeMap;

use super::analysis::Entry;

/// Passengers and seats on the leg from one stop to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassengerCount {
    pub from_stop: String,
    /// `None` for the observation at the last stop.
    pub to_stop: Option<String>,
    pub passengers: u32,
    pub seats: u32,
}

type DepartureKey = (String, String, String);

/// Observations keyed by line, route and departure, each in stop order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassengerCounts {
    departures: BTreeMap<DepartureKey, Vec<PassengerCount>>,
}

impl PassengerCounts {
    /// Group analysis entries. Entries of a departure keep their emission
    /// order, which is stop order.
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut departures: BTreeMap<DepartureKey, Vec<PassengerCount>> = BTreeMap::new();
        for entry in entries {
            departures
                .entry((
                    entry.line.clone(),
                    entry.route.clone(),
                    entry.departure.clone(),
                ))
                .or_default()
                .push(PassengerCount {
                    from_stop: entry.from_stop.clone(),
                    to_stop: entry.to_stop.clone(),
                    passengers: entry.passengers,
                    seats: entry.seats,
                });
        }
        Self { departures }
    }

    /// Observations of a departure; empty if none were made.
    pub fn get(&self, line: &str, route: &str, departure: &str) -> &[PassengerCount] {
        self.departures
            .get(&(line.to_string(), route.to_string(), departure.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of departures with observations.
    pub fn len(&self) -> usize {
        self.departures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departures.is_empty()
    }
}
