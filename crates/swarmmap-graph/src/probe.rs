//! Connectivity probing: does a second, independent route reach each node?
//!
//! A probe from `root` to `target` runs two relaxation passes:
//!
//! 1. Shortest paths from `root` over every enabled link.
//! 2. The route found to `target` is cut (its links, and every relay on it
//!    other than the endpoints), and shortest paths are recomputed.
//!
//! If `target` is unreachable after the cut, the only thing standing between
//! it and the rest of the swarm was that one route. Whether that makes
//! `target` the weak point depends on how much of the swarm `root` still sees,
//! which is what [`ProbeState::sweep`] decides.
//!
//! All per-pass bookkeeping lives in [`ProbeState`], never on the nodes, so a
//! graph can be probed from several roots without interference.

use std::collections::VecDeque;

use tracing::trace;

use crate::graph::Graph;
use crate::node::NodeIndex;

/// Distance of a node no pass has reached yet.
pub const UNREACHED: f64 = f64::INFINITY;

/// How a node was reached: through `edge` (a slot in `node`'s edge list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hop {
    node: NodeIndex,
    edge: usize,
}

/// Scratch table for probing one graph.
#[derive(Debug)]
pub struct ProbeState {
    weight: Vec<f64>,
    parent: Vec<Option<Hop>>,
    node_disabled: Vec<bool>,
    edge_disabled: Vec<Vec<bool>>,
    queued: Vec<bool>,
    queue: VecDeque<NodeIndex>,
    reached: usize,
}

impl ProbeState {
    /// Allocate scratch space sized for `graph`.
    pub fn new(graph: &Graph) -> Self {
        let n = graph.total_nodes();
        Self {
            weight: vec![UNREACHED; n],
            parent: vec![None; n],
            node_disabled: vec![false; n],
            edge_disabled: graph.nodes().map(|node| vec![false; node.edge_count()]).collect(),
            queued: vec![false; n],
            queue: VecDeque::with_capacity(n),
            reached: 0,
        }
    }

    /// Best known distance from the last probe's root.
    pub fn distance(&self, idx: NodeIndex) -> Option<f64> {
        let w = self.weight[idx.0];
        (w != UNREACHED).then_some(w)
    }

    /// Predecessor on the best known route from the last probe's root.
    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.parent[idx.0].map(|hop| hop.node)
    }

    pub fn is_disabled(&self, idx: NodeIndex) -> bool {
        self.node_disabled[idx.0]
    }

    /// Whether `root` still has an uncut link straight to `target`.
    pub fn links_directly(&self, graph: &Graph, root: NodeIndex, target: NodeIndex) -> bool {
        graph
            .node(root)
            .edges()
            .iter()
            .enumerate()
            .any(|(slot, edge)| edge.target == target && !self.edge_disabled[root.0][slot])
    }

    /// Nodes first reached during the last probe, counting both passes.
    pub fn reached(&self) -> usize {
        self.reached
    }

    /// Clear distances, routes, and every cut. Degenerate nodes stay disabled.
    fn full_reset(&mut self, graph: &Graph) {
        self.light_reset();
        for (disabled, node) in self.node_disabled.iter_mut().zip(graph.nodes()) {
            *disabled = node.is_degenerate();
        }
        for flags in &mut self.edge_disabled {
            flags.fill(false);
        }
        self.reached = 0;
    }

    /// Clear distances and routes, keeping cuts.
    fn light_reset(&mut self) {
        self.weight.fill(UNREACHED);
        self.parent.fill(None);
    }

    /// Label-correcting shortest paths from `root` over enabled links.
    fn relax(&mut self, graph: &Graph, root: NodeIndex) {
        self.weight[root.0] = 0.0;
        self.parent[root.0] = None;

        self.queued.fill(false);
        self.queue.clear();
        self.queue.push_back(root);
        self.queued[root.0] = true;

        while let Some(current) = self.queue.pop_front() {
            self.queued[current.0] = false;
            let base = self.weight[current.0];

            for (slot, edge) in graph.node(current).edges().iter().enumerate() {
                let target = edge.target.0;
                if self.edge_disabled[current.0][slot] || self.node_disabled[target] {
                    continue;
                }

                let candidate = base + edge.weight;
                if self.weight[target] > candidate {
                    if self.weight[target] == UNREACHED {
                        self.reached += 1;
                    }
                    self.weight[target] = candidate;
                    self.parent[target] = Some(Hop {
                        node: current,
                        edge: slot,
                    });
                    if !self.queued[target] {
                        self.queued[target] = true;
                        self.queue.push_back(edge.target);
                    }
                }
            }
        }
    }

    /// Cut the route currently leading to `target`: every link on it, and
    /// every relay between `root` and `target`.
    fn disable_route(&mut self, root: NodeIndex, target: NodeIndex) {
        let mut cursor = target;
        while let Some(hop) = self.parent[cursor.0] {
            self.edge_disabled[hop.node.0][hop.edge] = true;
            if hop.node == root {
                break;
            }
            self.node_disabled[hop.node.0] = true;
            cursor = hop.node;
        }
    }

    /// Run both passes for one `root`/`target` pair.
    ///
    /// Afterwards [`parent`](Self::parent) of `target` is `Some` exactly
    /// when a second route survived the cut.
    pub fn probe(&mut self, graph: &Graph, root: NodeIndex, target: NodeIndex) {
        self.full_reset(graph);
        self.relax(graph, root);
        self.disable_route(root, target);
        self.light_reset();
        self.relax(graph, root);
    }

    /// Probe every other node from `root` and return those lacking a
    /// redundant route, in arena order.
    ///
    /// A target with no surviving route is flagged when `root` still reached
    /// more than two nodes beyond those already flagged, unless it is still
    /// linked to `root` after the cut and carries two or more links of its
    /// own. Degenerate nodes are never targets.
    pub fn sweep(&mut self, graph: &Graph, root: NodeIndex) -> Vec<NodeIndex> {
        let root_node = graph.node(root);
        let mut flagged = Vec::new();

        for target in graph.indices() {
            let target_node = graph.node(target);
            if target == root || target_node.is_degenerate() {
                continue;
            }

            self.probe(graph, root, target);
            if self.parent[target.0].is_some() {
                continue;
            }

            let margin = self.reached.saturating_sub(flagged.len());
            let bad = if self.links_directly(graph, root, target) {
                margin > 2 && target_node.edge_count() < 2
            } else {
                margin > 2
            };

            trace!(
                root = %root_node.id(),
                target = %target_node.id(),
                reached = self.reached,
                bad,
                "no second route"
            );
            if bad {
                flagged.push(target);
            }
        }
        flagged
    }
}
