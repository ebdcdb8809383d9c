//! Request composition settings.
//!
//! Every field has a default, so a configuration document only needs to
//! list what differs from the defaults.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::request::CostParameters;

use super::selection::LineFilter;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("depot {0} is configured more than once")]
    DuplicateDepot(String),

    #[error("more than one depot configured at location {0}")]
    DuplicateDepotLocation(String),

    #[error("sample size must be in (0, 1], got {0}")]
    InvalidSampleSize(f64),

    #[error("dead head trip speed limit must be positive, got {0} m/s")]
    InvalidSpeedLimit(f64),
}

/// A vehicle type overriding the scenario's vehicle types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTypeConfig {
    pub id: String,
    pub capacity: u32,
    pub seats: u32,
    pub maximal_formation_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalConfig {
    /// When non-empty, replaces the vehicle types of the scenario.
    pub vehicle_types: Vec<VehicleTypeConfig>,
    pub line_filter: LineFilter,
    /// Share of the population simulated; counts are scaled up by its
    /// inverse.
    pub sample_size: f64,
    /// Meters per second.
    pub dead_head_trip_speed_limit: f64,
    pub forbid_dead_head_trips: bool,
    /// Seconds. Shorter stops do not count into a location's day limit.
    pub day_limit_threshold: u32,
    /// Seconds. Passengers riding longer are counted as seated.
    pub seat_duration_threshold: u32,
    /// Date the timetable's departures are placed on. Today if unset.
    pub service_date: Option<NaiveDate>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            vehicle_types: Vec::new(),
            line_filter: LineFilter::All,
            sample_size: 1.0,
            dead_head_trip_speed_limit: 25.0,
            forbid_dead_head_trips: false,
            day_limit_threshold: 0,
            seat_duration_threshold: 15 * 60,
            service_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedTypeConfig {
    pub vehicle_type: String,
    pub capacity: u32,
}

/// An explicitly configured depot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepotFacility {
    pub id: String,
    pub location: String,
    pub capacity: u32,
    #[serde(default)]
    pub allowed_types: Vec<AllowedTypeConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DepotConfig {
    /// Only used when `create_at_terminal_locations` is off.
    pub facilities: Vec<DepotFacility>,
    pub default_capacity: u32,
    pub default_id_prefix: String,
    /// Create a depot at the first stop of every route.
    pub create_at_terminal_locations: bool,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            facilities: Vec::new(),
            default_capacity: 999,
            default_id_prefix: "dpt_".to_string(),
            create_at_terminal_locations: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShuntingConfig {
    /// Stops along a route where units can be coupled or uncoupled.
    pub on_route_locations: BTreeSet<String>,
    pub default_maximal_formation_count: u32,
    pub minimal_duration: u32,
    pub dead_head_trip_duration: u32,
    pub coupling_duration: u32,
}

impl Default for ShuntingConfig {
    fn default() -> Self {
        Self {
            on_route_locations: BTreeSet::new(),
            default_maximal_formation_count: 3,
            minimal_duration: 60,
            dead_head_trip_duration: 2 * 60,
            coupling_duration: 3 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSlotConfig {
    pub id: String,
    pub location: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub track_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaintenanceConfig {
    pub slots: Vec<MaintenanceSlotConfig>,
    /// Meters.
    pub maximal_distance: u32,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            maximal_distance: 15_000 * 1000,
        }
    }
}

/// Cost rates, all per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CostsConfig {
    pub staff: u32,
    pub idle: u32,
    pub service_trip: u32,
    pub dead_head_trip: u32,
    pub maintenance: u32,
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self {
            staff: 100,
            idle: 25,
            service_trip: 50,
            dead_head_trip: 75,
            maintenance: 200,
        }
    }
}

impl From<CostsConfig> for CostParameters {
    fn from(costs: CostsConfig) -> Self {
        CostParameters {
            staff: costs.staff,
            service_trip: costs.service_trip,
            maintenance: costs.maintenance,
            dead_head_trip: costs.dead_head_trip,
            idle: costs.idle,
        }
    }
}

/// Settings for composing a request from a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComposerConfig {
    pub global: GlobalConfig,
    pub depot: DepotConfig,
    pub shunting: ShuntingConfig,
    pub maintenance: MaintenanceConfig,
    pub costs: CostsConfig,
}

impl ComposerConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sample_size = self.global.sample_size;
        if !(sample_size > 0.0 && sample_size <= 1.0) {
            return Err(ConfigError::InvalidSampleSize(sample_size));
        }
        let limit = self.global.dead_head_trip_speed_limit;
        if !(limit.is_finite() && limit > 0.0) {
            return Err(ConfigError::InvalidSpeedLimit(limit));
        }

        let mut ids = HashSet::new();
        let mut locations = HashSet::new();
        for depot in &self.depot.facilities {
            if !ids.insert(depot.id.as_str()) {
                return Err(ConfigError::DuplicateDepot(depot.id.clone()));
            }
            if !locations.insert(depot.location.as_str()) {
                return Err(ConfigError::DuplicateDepotLocation(depot.location.clone()));
            }
        }
        Ok(())
    }
}
