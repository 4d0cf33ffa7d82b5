//! Nodes, edges, and the identifiers that address them.

use std::collections::BTreeSet;

use crate::position::Fix;

/// A swarm unit's identifier, as carried in telemetry frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u16);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for NodeId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

/// Arena handle for a node inside one [`crate::Graph`].
///
/// Handles are only stable until the next [`crate::Graph::prune`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub usize);

/// Health report for a swarm unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status {
    pub hp: i32,
    pub max_hp: u32,
    pub armor: u8,
    pub category: u8,
    /// Maximum speed in m/s
    pub speed: f32,
}

impl Status {
    /// Remaining health as a percentage of maximum.
    ///
    /// `None` when `max_hp` is zero.
    pub fn health_percent(&self) -> Option<f64> {
        if self.max_hp == 0 {
            return None;
        }
        Some(f64::from(self.hp) / f64::from(self.max_hp) * 100.0)
    }
}

/// One direction of a link. Links always exist as a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub target: NodeIndex,
    pub weight: f64,
}

/// A swarm unit in the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) fix: Option<Fix>,
    pub(crate) status: Option<Status>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) too_close: BTreeSet<NodeId>,
}

impl Node {
    pub(crate) fn placeholder(id: NodeId) -> Self {
        Self {
            id,
            fix: None,
            status: None,
            edges: Vec::new(),
            too_close: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Accepted position, altitude in metres.
    pub fn fix(&self) -> Option<&Fix> {
        self.fix.as_ref()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes that sit too close to this one to form a link.
    pub fn invalid_neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.too_close.iter().copied()
    }

    /// Degenerate nodes are excluded from every connectivity probe.
    pub fn is_degenerate(&self) -> bool {
        !self.too_close.is_empty()
    }

    /// Whether an edge leads directly to `target`, disabled or not.
    pub fn links_to(&self, target: NodeIndex) -> bool {
        self.edges.iter().any(|e| e.target == target)
    }

    pub(crate) fn edge_to_mut(&mut self, target: NodeIndex) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|e| e.target == target)
    }
}
