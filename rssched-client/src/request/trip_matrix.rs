//! Dead head trip matrix.
//!
//! Relations are accumulated per ordered location pair and sealed into a
//! square matrix over the sorted location ids.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::error::RequestError;

/// Durations (seconds) and distances (meters) between all pairs of locations.
///
/// Row and column `i` both refer to `indices[i]`. The diagonal is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMatrix {
    indices: Vec<String>,
    durations: Vec<Vec<u32>>,
    distances: Vec<Vec<u32>>,
}

impl TripMatrix {
    /// Sorted location ids.
    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    pub fn durations(&self) -> &[Vec<u32>] {
        &self.durations
    }

    pub fn distances(&self) -> &[Vec<u32>] {
        &self.distances
    }

    /// Duration from `origin` to `destination`, if both are in the matrix.
    pub fn duration(&self, origin: &str, destination: &str) -> Option<u32> {
        let (i, j) = self.position(origin, destination)?;
        Some(self.durations[i][j])
    }

    /// Distance from `origin` to `destination`, if both are in the matrix.
    pub fn distance(&self, origin: &str, destination: &str) -> Option<u32> {
        let (i, j) = self.position(origin, destination)?;
        Some(self.distances[i][j])
    }

    fn position(&self, origin: &str, destination: &str) -> Option<(usize, usize)> {
        let i = self
            .indices
            .binary_search_by(|id| id.as_str().cmp(origin))
            .ok()?;
        let j = self
            .indices
            .binary_search_by(|id| id.as_str().cmp(destination))
            .ok()?;
        Some((i, j))
    }
}

#[derive(Debug, Clone, Copy)]
struct Relation {
    duration: u32,
    distance: u32,
}

/// Accumulates relations before the matrix is sealed.
#[derive(Debug, Default)]
pub(crate) struct TripMatrixBuilder {
    locations: BTreeSet<String>,
    relations: BTreeMap<String, BTreeMap<String, Relation>>,
}

impl TripMatrixBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add or replace the relation from `origin` to `destination`.
    pub(crate) fn add_relation(
        &mut self,
        origin: &str,
        destination: &str,
        duration: u32,
        distance: u32,
    ) -> Result<(), RequestError> {
        if origin.is_empty() || destination.is_empty() {
            return Err(RequestError::EmptyLocationId);
        }
        self.locations.insert(origin.to_string());
        self.locations.insert(destination.to_string());
        self.relations
            .entry(origin.to_string())
            .or_default()
            .insert(destination.to_string(), Relation { duration, distance });
        Ok(())
    }

    pub(crate) fn contains_relation(&self, origin: &str, destination: &str) -> bool {
        self.relations
            .get(origin)
            .is_some_and(|targets| targets.contains_key(destination))
    }

    pub(crate) fn build(self) -> Result<TripMatrix, RequestError> {
        if self.locations.len() < 2 {
            return Err(RequestError::TooFewMatrixLocations);
        }

        let origins: BTreeSet<&String> = self.relations.keys().collect();
        let destinations: BTreeSet<&String> =
            self.relations.values().flat_map(|t| t.keys()).collect();
        if origins != destinations {
            return Err(RequestError::InconsistentMatrix);
        }

        let indices: Vec<String> = self.locations.into_iter().collect();
        let n = indices.len();
        let mut durations = Vec::with_capacity(n);
        let mut distances = Vec::with_capacity(n);

        for origin in &indices {
            let mut duration_row = Vec::with_capacity(n);
            let mut distance_row = Vec::with_capacity(n);
            for destination in &indices {
                if origin == destination {
                    duration_row.push(0);
                    distance_row.push(0);
                    continue;
                }
                let relation = self
                    .relations
                    .get(origin)
                    .and_then(|targets| targets.get(destination))
                    .ok_or_else(|| RequestError::MissingRelation {
                        origin: origin.clone(),
                        destination: destination.clone(),
                    })?;
                duration_row.push(relation.duration);
                distance_row.push(relation.distance);
            }
            durations.push(duration_row);
            distances.push(distance_row);
        }

        Ok(TripMatrix {
            indices,
            durations,
            distances,
        })
    }
}
