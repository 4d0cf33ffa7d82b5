//! Minimal correction search: sweep from every root, keep the smallest set.

use tracing::{debug, info};

use crate::graph::Graph;
use crate::node::{NodeId, NodeIndex};
use crate::probe::ProbeState;

/// Nodes that must move for every remaining node to have a redundant route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BadNodeSet {
    root: Option<NodeId>,
    nodes: Vec<NodeId>,
}

impl BadNodeSet {
    /// The root whose sweep produced this set, if any sweep ran.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Flagged ids in the order the sweep found them.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }
}

impl Graph {
    /// Find the smallest set of nodes whose relocation leaves the swarm with
    /// no single-route nodes, and store it on the graph.
    ///
    /// Every node is tried as root, linked or not. The first smallest set
    /// wins; an empty set ends the search early. Calling this again on an
    /// unchanged graph gives the same set.
    pub fn analyze(&mut self) -> &BadNodeSet {
        let mut state = ProbeState::new(self);
        let mut best: Option<(NodeIndex, Vec<NodeIndex>)> = None;
        let mut roots = 0usize;

        for root in self.indices() {
            roots += 1;
            let flagged = state.sweep(self, root);
            debug!(root = %self.node(root).id(), flagged = flagged.len(), "sweep finished");

            if best.as_ref().map_or(true, |(_, b)| flagged.len() < b.len()) {
                let done = flagged.is_empty();
                best = Some((root, flagged));
                if done {
                    break;
                }
            }
        }

        self.bad_nodes = match best {
            Some((root, flagged)) => BadNodeSet {
                root: Some(self.node(root).id()),
                nodes: flagged.into_iter().map(|i| self.node(i).id()).collect(),
            },
            None => BadNodeSet::default(),
        };

        info!(
            nodes = self.total_nodes(),
            roots,
            flagged = self.bad_nodes.len(),
            "analysis complete"
        );
        &self.bad_nodes
    }

    /// Result of the last [`analyze`](Self::analyze); empty before the first.
    pub fn bad_nodes(&self) -> &BadNodeSet {
        &self.bad_nodes
    }
}
