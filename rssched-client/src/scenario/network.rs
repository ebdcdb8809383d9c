//! Transport network: nodes and directed links.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A directed link between two network nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub from_node: String,
    pub to_node: String,
    /// Meters.
    pub length: f64,
    /// Meters per second.
    pub free_speed: f64,
}

/// The rail network, links keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    /// Nodes without links are allowed; link endpoints need not be listed.
    #[serde(default)]
    pub nodes: BTreeSet<String>,
    pub links: BTreeMap<String, Link>,
}

impl Network {
    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    /// Insert a link, registering both endpoints as nodes.
    pub fn add_link(
        &mut self,
        id: impl Into<String>,
        from_node: impl Into<String>,
        to_node: impl Into<String>,
        length: f64,
        free_speed: f64,
    ) -> &mut Self {
        let from_node = from_node.into();
        let to_node = to_node.into();
        self.nodes.insert(from_node.clone());
        self.nodes.insert(to_node.clone());
        self.links.insert(
            id.into(),
            Link {
                from_node,
                to_node,
                length,
                free_speed,
            },
        );
        self
    }

    /// All nodes, including link endpoints missing from `nodes`.
    pub fn all_nodes(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .map(String::as_str)
            .chain(
                self.links
                    .values()
                    .flat_map(|l| [l.from_node.as_str(), l.to_node.as_str()]),
            )
            .collect()
    }
}
