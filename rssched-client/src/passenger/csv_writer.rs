//! CSV export of passenger analysis entries.

use std::io;

use serde::Serialize;

use crate::scenario::Timetable;

use super::analysis::Entry;

#[derive(Debug, Serialize)]
struct Row<'a> {
    transit_line_id: &'a str,
    transit_route_id: &'a str,
    departure_id: &'a str,
    stop_id: &'a str,
    stop_name: &'a str,
    arrival: Option<String>,
    departure: Option<String>,
    egress: u32,
    access: u32,
    to_stop_id: Option<&'a str>,
    to_stop_name: Option<&'a str>,
    passengers: u32,
    seats: u32,
}

/// Write entries as CSV with a header row.
///
/// Stop names and times are looked up in `timetable`. The arrival is empty
/// at the first stop of a route, the departure and next stop are empty at
/// the last one.
pub fn write_entries<W: io::Write>(
    writer: W,
    entries: &[Entry],
    timetable: &Timetable,
) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    for entry in entries {
        let route = timetable.route(&entry.line, &entry.route);
        let start = route
            .and_then(|r| r.departure(&entry.departure))
            .map(|d| d.departure_time);
        let stop = route.and_then(|r| r.stops.get(entry.stop_index));
        let name = |id: &str| timetable.facility(id).map_or("", |f| f.name.as_str());

        let arrival = start
            .zip(stop.and_then(|s| s.arrival_offset))
            .map(|(t, offset)| format_time(t + offset));
        let departure = match entry.to_stop {
            Some(_) => start
                .zip(stop.map(|s| s.departure_or_arrival()))
                .map(|(t, offset)| format_time(t + offset)),
            None => None,
        };

        out.serialize(Row {
            transit_line_id: &entry.line,
            transit_route_id: &entry.route,
            departure_id: &entry.departure,
            stop_id: &entry.from_stop,
            stop_name: name(&entry.from_stop),
            arrival,
            departure,
            egress: entry.egress,
            access: entry.access,
            to_stop_id: entry.to_stop.as_deref(),
            to_stop_name: entry.to_stop.as_deref().map(name),
            passengers: entry.passengers,
            seats: entry.seats,
        })?;
    }
    out.flush()?;
    Ok(())
}

/// Format seconds after midnight as `HH:MM:SS`. Hours may exceed 23.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.floor() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{sign}{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
