//! Selection of the transit lines and routes of interest.

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scenario::{Scenario, TransitRoute};

/// Group assigned to lines selected without categories.
pub const NO_GROUP: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("line {line} is already associated with group {existing}, cannot add it to {group}")]
    GroupConflict {
        line: String,
        existing: String,
        group: String,
    },

    #[error("no departures found for route {0}")]
    NoDepartures(String),

    #[error("inconsistent vehicle types found in departures of route {0}")]
    InconsistentVehicleTypes(String),

    #[error("vehicle {vehicle} of route {route} not found in vehicle registry")]
    UnknownVehicle { vehicle: String, route: String },
}

/// Vehicle types sharing a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleCategory {
    pub group: String,
    pub vehicle_types: BTreeSet<String>,
}

/// How lines of interest are chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "camelCase")]
pub enum LineFilter {
    /// Every route of every line.
    #[default]
    All,
    /// Routes whose departures all use a vehicle type of one of the
    /// categories. A route mixing vehicle types is an error.
    VehicleCategories { categories: Vec<VehicleCategory> },
}

impl LineFilter {
    pub fn select(&self, scenario: &Scenario) -> Result<LineSelection, SelectionError> {
        let mut selection = LineSelection::default();
        match self {
            LineFilter::All => {
                info!("Selecting all transit lines");
                for line in &scenario.timetable.lines {
                    for route in &line.routes {
                        selection.add(NO_GROUP, &line.id, &route.id)?;
                    }
                }
            }
            LineFilter::VehicleCategories { categories } => {
                let lookup: BTreeMap<&str, &str> = categories
                    .iter()
                    .flat_map(|c| {
                        c.vehicle_types
                            .iter()
                            .map(move |vt| (vt.as_str(), c.group.as_str()))
                    })
                    .collect();
                for line in &scenario.timetable.lines {
                    for route in &line.routes {
                        let vehicle_type = consistent_vehicle_type(scenario, route)?;
                        if let Some(group) = lookup.get(vehicle_type) {
                            selection.add(group, &line.id, &route.id)?;
                        }
                    }
                }
                info!(
                    lines = selection.len(),
                    categories = categories.len(),
                    "Selected transit lines by vehicle category"
                );
            }
        }
        Ok(selection)
    }
}

fn consistent_vehicle_type<'s>(
    scenario: &'s Scenario,
    route: &TransitRoute,
) -> Result<&'s str, SelectionError> {
    let mut found: Option<&str> = None;
    for departure in &route.departures {
        let vehicle_type =
            scenario
                .vehicle_type_of(departure)
                .ok_or_else(|| SelectionError::UnknownVehicle {
                    vehicle: departure.vehicle.clone(),
                    route: route.id.clone(),
                })?;
        match found {
            None => found = Some(vehicle_type),
            Some(first) if first != vehicle_type => {
                return Err(SelectionError::InconsistentVehicleTypes(route.id.clone()));
            }
            Some(_) => {}
        }
    }
    found.ok_or_else(|| SelectionError::NoDepartures(route.id.clone()))
}

/// A selected line: its group and selected routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedLine {
    pub group: String,
    pub routes: BTreeSet<String>,
}

/// Selected lines keyed by line id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSelection {
    lines: BTreeMap<String, SelectedLine>,
}

impl LineSelection {
    /// Add a route of a line. A line belongs to exactly one group.
    pub fn add(&mut self, group: &str, line: &str, route: &str) -> Result<(), SelectionError> {
        let selected = self
            .lines
            .entry(line.to_string())
            .or_insert_with(|| SelectedLine {
                group: group.to_string(),
                routes: BTreeSet::new(),
            });
        if selected.group != group {
            return Err(SelectionError::GroupConflict {
                line: line.to_string(),
                existing: selected.group.clone(),
                group: group.to_string(),
            });
        }
        selected.routes.insert(route.to_string());
        debug!(line, route, group, "Added route to selection");
        Ok(())
    }

    pub fn line_ids(&self) -> BTreeSet<String> {
        self.lines.keys().cloned().collect()
    }

    pub fn contains(&self, line: &str, route: &str) -> bool {
        self.lines
            .get(line)
            .is_some_and(|l| l.routes.contains(route))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SelectedLine)> {
        self.lines.iter().map(|(id, line)| (id.as_str(), line))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct Row<'a> {
    group: &'a str,
    transit_line_id: &'a str,
    transit_route_id: &'a str,
}

/// Write one CSV row per selected route, ordered by line and route.
pub fn write_selection<W: io::Write>(
    writer: W,
    selection: &LineSelection,
) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    for (line, selected) in selection.iter() {
        for route in &selected.routes {
            out.serialize(Row {
                group: &selected.group,
                transit_line_id: line,
                transit_route_id: route,
            })?;
        }
    }
    out.flush()?;
    Ok(())
}
