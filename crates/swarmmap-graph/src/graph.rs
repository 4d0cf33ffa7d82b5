//! Node store and edge validator.
//!
//! Nodes live in an arena and are addressed by [`NodeIndex`]; a side map
//! resolves telemetry ids. Links are only ever built when a node receives its
//! position, against every node that already has one, so each pair is
//! validated exactly once.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::config::GraphConfig;
use crate::error::{Error, Payload, Result};
use crate::node::{Edge, Node, NodeId, NodeIndex, Status};
use crate::position::{Fix, Position};
use crate::search::BadNodeSet;

/// Outcome of validating one node pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Link {
    /// At least one side has no position yet.
    Unplaced,
    /// Altitude difference exceeds the limit.
    AltitudeGap(f64),
    /// 3-D separation exceeds the link radius.
    OutOfRange(f64),
    /// Separation at or below the minimum; both nodes are now degenerate.
    TooClose(f64),
    /// A link pair was created with this weight.
    Connected(f64),
}

/// The swarm graph: every node seen during ingestion and the links between them.
#[derive(Debug, Default)]
pub struct Graph {
    config: GraphConfig,
    nodes: Vec<Node>,
    index: HashMap<NodeId, NodeIndex>,
    pub(crate) bad_nodes: BadNodeSet,
}

impl Graph {
    /// Create an empty graph with default link rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with the given link rules.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Link rules this graph was built with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Number of nodes created so far, placeholders included.
    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node has been created yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by telemetry id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.index_of(id).map(|idx| self.node(idx))
    }

    /// Arena index of a telemetry id, if the node exists.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    /// Node at an arena index.
    ///
    /// # Panics
    ///
    /// If `idx` did not come from this graph.
    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx.0]
    }

    /// All nodes in arrival order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All arena indices in arrival order.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    /// Attach a position to a node, creating it if needed, and link it to
    /// every other placed node within range.
    pub fn insert_position(&mut self, id: NodeId, position: Position) -> Result<()> {
        if self.get(id).is_some_and(|n| n.fix.is_some()) {
            return Err(Error::DuplicateId {
                id,
                payload: Payload::Position,
            });
        }

        let fix = Fix::from_report(position, self.config.altitude_scale)
            .map_err(|(field, value)| Error::OutOfRange { id, field, value })?;

        let idx = self.find_or_create(id)?;
        self.nodes[idx.0].fix = Some(fix);

        for other in 0..self.nodes.len() {
            if other != idx.0 && self.nodes[other].fix.is_some() {
                self.validate_edge(idx, NodeIndex(other));
            }
        }
        Ok(())
    }

    /// Attach a status to a node, creating it if needed.
    pub fn insert_status(&mut self, id: NodeId, status: Status) -> Result<()> {
        if self.get(id).is_some_and(|n| n.status.is_some()) {
            return Err(Error::DuplicateId {
                id,
                payload: Payload::Status,
            });
        }

        let idx = self.find_or_create(id)?;
        self.nodes[idx.0].status = Some(status);
        Ok(())
    }

    fn find_or_create(&mut self, id: NodeId) -> Result<NodeIndex> {
        if let Some(idx) = self.index_of(id) {
            return Ok(idx);
        }

        self.nodes.try_reserve(1)?;
        self.index.try_reserve(1)?;

        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(Node::placeholder(id));
        self.index.insert(id, idx);
        trace!(node = %id, "created node");
        Ok(idx)
    }

    /// Decide whether `a` and `b` are linked, and record the result.
    pub(crate) fn validate_edge(&mut self, a: NodeIndex, b: NodeIndex) -> Link {
        let (Some(fa), Some(fb)) = (self.nodes[a.0].fix, self.nodes[b.0].fix) else {
            return Link::Unplaced;
        };
        let (ida, idb) = (self.nodes[a.0].id, self.nodes[b.0].id);

        let altitude_delta = fa.altitude_delta(&fb);
        if altitude_delta > self.config.max_altitude_delta {
            trace!(a = %ida, b = %idb, altitude_delta, "no link: altitude gap");
            return Link::AltitudeGap(altitude_delta);
        }

        let distance = fa.distance_3d(&fb);
        if distance > self.config.max_range {
            trace!(a = %ida, b = %idb, distance, "no link: out of range");
            return Link::OutOfRange(distance);
        }

        if distance <= self.config.min_separation {
            self.nodes[a.0].too_close.insert(idb);
            self.nodes[b.0].too_close.insert(ida);
            debug!(a = %ida, b = %idb, distance, "nodes too close, both excluded from probes");
            return Link::TooClose(distance);
        }

        self.nodes[a.0].edges.push(Edge {
            target: b,
            weight: distance,
        });
        self.nodes[b.0].edges.push(Edge {
            target: a,
            weight: distance,
        });
        debug!(a = %ida, b = %idb, distance, "linked");

        self.apply_congestion_bias(a, b);
        Link::Connected(distance)
    }

    /// Steer shortest paths away from relays that already carry more than
    /// two links.
    ///
    /// Runs after the pair `a`–`b` is added. When both ends are busy the
    /// `a`–`b` link becomes heavy, and so does every link from `b` to another
    /// busy node. The override reaches one hop from `b` only.
    fn apply_congestion_bias(&mut self, a: NodeIndex, b: NodeIndex) {
        if !(self.is_busy(a) && self.is_busy(b)) {
            return;
        }

        let heavy = self.config.heavy_weight;
        self.set_link_weight(a, b, heavy);

        let busy_peers: Vec<NodeIndex> = self.nodes[b.0]
            .edges
            .iter()
            .map(|e| e.target)
            .filter(|&t| self.is_busy(t))
            .collect();
        for peer in busy_peers {
            self.set_link_weight(b, peer, heavy);
        }

        debug!(
            a = %self.nodes[a.0].id,
            b = %self.nodes[b.0].id,
            "congestion bias applied"
        );
    }

    fn is_busy(&self, n: NodeIndex) -> bool {
        self.nodes[n.0].edge_count() > 2
    }

    /// Set both directions of a link to the same weight.
    fn set_link_weight(&mut self, a: NodeIndex, b: NodeIndex, weight: f64) {
        if let Some(edge) = self.nodes[a.0].edge_to_mut(b) {
            edge.weight = weight;
        }
        if let Some(edge) = self.nodes[b.0].edge_to_mut(a) {
            edge.weight = weight;
        }
    }

    /// Drop every node that never received a position.
    ///
    /// Returns how many were removed. Arena indices are compacted, so any
    /// [`NodeIndex`] held across this call is invalid afterwards. A previous
    /// analysis result is discarded.
    pub fn prune(&mut self) -> usize {
        let before = self.nodes.len();
        let mut remap = vec![None; before];
        let mut kept = Vec::with_capacity(before);

        for (old, node) in std::mem::take(&mut self.nodes).into_iter().enumerate() {
            if node.fix.is_some() {
                remap[old] = Some(NodeIndex(kept.len()));
                kept.push(node);
            } else {
                debug!(node = %node.id, "pruned node without position");
            }
        }

        for node in &mut kept {
            node.edges.retain_mut(|edge| match remap[edge.target.0] {
                Some(new) => {
                    edge.target = new;
                    true
                }
                None => false,
            });
        }

        self.index = kept
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id, NodeIndex(i)))
            .collect();
        self.nodes = kept;
        self.bad_nodes = BadNodeSet::default();

        before - self.nodes.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::position::EARTH_RADIUS_M;

    /// Degrees spanning `metres` along a meridian or the equator.
    pub(crate) fn deg(metres: f64) -> f64 {
        (metres / EARTH_RADIUS_M).to_degrees()
    }

    /// A position `north` and `east` metres from (0, 0), altitude in metres.
    pub(crate) fn at(north: f64, east: f64, altitude_m: f64) -> Position {
        Position::new(deg(north), deg(east), (altitude_m / crate::ALTITUDE_SCALE) as f32)
    }

    pub(crate) fn place(graph: &mut Graph, id: u16, north: f64, east: f64) {
        graph.insert_position(NodeId(id), at(north, east, 0.0)).unwrap();
    }

    /// Link `a` and `b` with an arbitrary weight, bypassing the validator.
    pub(crate) fn link(graph: &mut Graph, a: u16, b: u16, weight: f64) {
        let a = graph.find_or_create(NodeId(a)).unwrap();
        let b = graph.find_or_create(NodeId(b)).unwrap();
        graph.nodes[a.0].edges.push(Edge { target: b, weight });
        graph.nodes[b.0].edges.push(Edge { target: a, weight });
    }

    fn edge_weight(graph: &Graph, a: u16, b: u16) -> Option<f64> {
        let target = graph.index_of(NodeId(b))?;
        graph
            .get(NodeId(a))?
            .edges()
            .iter()
            .find(|e| e.target == target)
            .map(|e| e.weight)
    }

    #[test]
    fn link_in_range() {
        let mut graph = Graph::new();
        place(&mut graph, 1, 0.0, 0.0);
        place(&mut graph, 2, 10.0, 0.0);

        let ab = edge_weight(&graph, 1, 2).unwrap();
        let ba = edge_weight(&graph, 2, 1).unwrap();
        assert!((ab - 10.0).abs() < 1e-6);
        assert_eq!(ab, ba);
        assert_eq!(graph.get(NodeId(1)).unwrap().edge_count(), 1);
        assert_eq!(graph.get(NodeId(2)).unwrap().edge_count(), 1);
    }

    #[test]
    fn link_at_exact_range() {
        let mut graph = Graph::new();
        let a = Fix::from_report(at(0.0, 0.0, 0.0), crate::ALTITUDE_SCALE).unwrap();
        let b = Fix::from_report(at(14.999_999, 0.0, 0.0), crate::ALTITUDE_SCALE).unwrap();
        assert!(a.distance_3d(&b) <= 15.0);

        place(&mut graph, 1, 0.0, 0.0);
        place(&mut graph, 2, 14.999_999, 0.0);
        assert!(edge_weight(&graph, 1, 2).is_some());
    }

    #[test]
    fn no_link_out_of_range() {
        let mut graph = Graph::new();
        place(&mut graph, 1, 0.0, 0.0);
        place(&mut graph, 2, 15.5, 0.0);

        assert!(edge_weight(&graph, 1, 2).is_none());
        assert_eq!(graph.get(NodeId(1)).unwrap().edge_count(), 0);
        assert_eq!(graph.get(NodeId(2)).unwrap().edge_count(), 0);
    }

    #[test]
    fn no_link_across_altitude_gap() {
        let mut graph = Graph::new();
        graph.insert_position(NodeId(1), at(0.0, 0.0, 0.0)).unwrap();
        // Directly overhead, 16 m up: the gap alone rules it out.
        graph.insert_position(NodeId(2), at(0.0, 0.0, 16.0)).unwrap();

        assert!(edge_weight(&graph, 1, 2).is_none());
        assert!(!graph.get(NodeId(1)).unwrap().is_degenerate());
    }

    #[test]
    fn altitude_counts_toward_distance() {
        let mut graph = Graph::new();
        graph.insert_position(NodeId(1), at(0.0, 0.0, 0.0)).unwrap();
        // 12 m across and 8.9 m up: 14.94 m in 3-D.
        graph.insert_position(NodeId(2), at(12.0, 0.0, 8.9)).unwrap();
        // 12 m across and 10 m up: 15.62 m, too far.
        graph.insert_position(NodeId(3), at(0.0, 12.0, 10.0)).unwrap();

        let w = edge_weight(&graph, 1, 2).unwrap();
        assert!((w - 12.0f64.hypot(8.9)).abs() < 1e-3, "got {w}");
        assert!(edge_weight(&graph, 1, 3).is_none());
    }

    #[test]
    fn too_close_marks_both_degenerate() {
        let mut graph = Graph::new();
        place(&mut graph, 1, 0.0, 0.0);
        place(&mut graph, 2, 1.0, 0.0);

        let a = graph.get(NodeId(1)).unwrap();
        let b = graph.get(NodeId(2)).unwrap();
        assert_eq!(a.edge_count(), 0);
        assert_eq!(b.edge_count(), 0);
        assert!(a.is_degenerate());
        assert!(b.is_degenerate());
        assert_eq!(a.invalid_neighbors().collect::<Vec<_>>(), vec![NodeId(2)]);
        assert_eq!(b.invalid_neighbors().collect::<Vec<_>>(), vec![NodeId(1)]);
    }

    #[test]
    fn too_close_bound_is_inclusive() {
        let mut graph = Graph::new();
        let a = graph.find_or_create(NodeId(1)).unwrap();
        let b = graph.find_or_create(NodeId(2)).unwrap();
        graph.nodes[a.0].fix = Some(Fix::from_report(at(0.0, 0.0, 0.0), 1.0).unwrap());
        graph.nodes[b.0].fix = Some(Fix::from_report(at(0.0, 0.0, 0.0), 1.0).unwrap());
        assert_eq!(graph.validate_edge(a, b), Link::TooClose(0.0));

        let c = graph.find_or_create(NodeId(3)).unwrap();
        graph.nodes[c.0].fix = Some(Fix::from_report(at(1.2, 0.0, 0.0), 1.0).unwrap());
        assert!(matches!(graph.validate_edge(c, b), Link::Connected(_)));
    }

    #[test]
    fn unplaced_pair_is_skipped() {
        let mut graph = Graph::new();
        graph.insert_status(NodeId(1), Status::default()).unwrap();
        place(&mut graph, 2, 0.0, 0.0);
        let a = graph.index_of(NodeId(1)).unwrap();
        let b = graph.index_of(NodeId(2)).unwrap();
        assert_eq!(graph.validate_edge(a, b), Link::Unplaced);
        assert_eq!(graph.get(NodeId(2)).unwrap().edge_count(), 0);
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let mut graph = Graph::new();
        place(&mut graph, 1, 0.0, 0.0);
        let original = *graph.get(NodeId(1)).unwrap().fix().unwrap();

        let err = graph
            .insert_position(NodeId(1), at(5.0, 5.0, 0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateId {
                id: NodeId(1),
                payload: Payload::Position
            }
        ));
        assert_eq!(*graph.get(NodeId(1)).unwrap().fix().unwrap(), original);
        assert_eq!(graph.total_nodes(), 1);
    }

    #[test]
    fn duplicate_status_is_rejected() {
        let mut graph = Graph::new();
        let first = Status {
            hp: 10,
            max_hp: 20,
            ..Status::default()
        };
        graph.insert_status(NodeId(4), first).unwrap();
        let err = graph.insert_status(NodeId(4), Status::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateId { payload: Payload::Status, .. }));
        assert_eq!(graph.get(NodeId(4)).unwrap().status(), Some(&first));
    }

    #[test]
    fn status_then_position_merge_into_one_node() {
        let mut graph = Graph::new();
        graph.insert_status(NodeId(9), Status::default()).unwrap();
        place(&mut graph, 9, 0.0, 0.0);

        assert_eq!(graph.total_nodes(), 1);
        let node = graph.get(NodeId(9)).unwrap();
        assert!(node.fix().is_some());
        assert!(node.status().is_some());
    }

    #[test]
    fn out_of_range_position_leaves_no_trace() {
        let mut graph = Graph::new();
        let err = graph
            .insert_position(NodeId(3), Position::new(91.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, Error::OutOfRange { field: "latitude", .. }));
        assert!(graph.get(NodeId(3)).is_none());
        assert_eq!(graph.total_nodes(), 0);
    }

    #[test]
    fn congestion_bias_needs_both_ends_busy() {
        let mut graph = Graph::new();
        // 1 collects three links, 10 collects three.
        place(&mut graph, 1, 0.0, 0.0);
        place(&mut graph, 10, 0.0, -10.0);
        place(&mut graph, 11, 10.0, -3.0);
        place(&mut graph, 12, -10.0, -3.0);
        assert_eq!(graph.get(NodeId(1)).unwrap().edge_count(), 3);

        // 2 links to 1 alone; 1 is busy but 2 is not.
        place(&mut graph, 2, 0.0, 14.0);
        let w = edge_weight(&graph, 1, 2).unwrap();
        assert!((w - 14.0).abs() < 1e-6);

        place(&mut graph, 20, 0.0, 24.0);
        place(&mut graph, 21, 10.0, 17.0);
        assert_eq!(graph.get(NodeId(2)).unwrap().edge_count(), 3);
        assert!((edge_weight(&graph, 1, 2).unwrap() - 14.0).abs() < 1e-6);

        // 2 reaches four links, but its new partner 22 is quiet.
        place(&mut graph, 22, -10.0, 17.0);
        assert_eq!(graph.get(NodeId(2)).unwrap().edge_count(), 4);
        assert!((edge_weight(&graph, 1, 2).unwrap() - 14.0).abs() < 1e-6);
    }

    #[test]
    fn congestion_bias_triggers_between_two_busy_nodes() {
        let mut graph = Graph::new();
        let a = graph.find_or_create(NodeId(1)).unwrap();
        let b = graph.find_or_create(NodeId(2)).unwrap();

        // Give both ends two existing links by hand.
        for (i, owner) in [(3u16, a), (4, a), (5, b), (6, b)] {
            let peer = graph.find_or_create(NodeId(i)).unwrap();
            graph.nodes[owner.0].edges.push(Edge { target: peer, weight: 1.5 });
            graph.nodes[peer.0].edges.push(Edge { target: owner, weight: 1.5 });
        }
        // One of b's peers is itself busy.
        let busy_peer = graph.index_of(NodeId(5)).unwrap();
        for i in [7u16, 8] {
            let extra = graph.find_or_create(NodeId(i)).unwrap();
            graph.nodes[busy_peer.0].edges.push(Edge { target: extra, weight: 1.5 });
            graph.nodes[extra.0].edges.push(Edge { target: busy_peer, weight: 1.5 });
        }

        graph.nodes[a.0].fix = Some(Fix::from_report(at(0.0, 0.0, 0.0), 1.0).unwrap());
        graph.nodes[b.0].fix = Some(Fix::from_report(at(5.0, 0.0, 0.0), 1.0).unwrap());
        assert!(matches!(graph.validate_edge(a, b), Link::Connected(_)));

        let heavy = graph.config().heavy_weight;
        assert_eq!(edge_weight(&graph, 1, 2), Some(heavy));
        assert_eq!(edge_weight(&graph, 2, 1), Some(heavy));
        // b -> busy peer 5 becomes heavy in both directions.
        assert_eq!(edge_weight(&graph, 2, 5), Some(heavy));
        assert_eq!(edge_weight(&graph, 5, 2), Some(heavy));
        // b -> quiet peer 6 keeps its weight; a's own spokes are untouched.
        assert_eq!(edge_weight(&graph, 2, 6), Some(1.5));
        assert_eq!(edge_weight(&graph, 1, 3), Some(1.5));
    }

    #[test]
    fn prune_drops_placeholders() {
        let mut graph = Graph::new();
        graph.insert_status(NodeId(1), Status::default()).unwrap();
        place(&mut graph, 2, 0.0, 0.0);
        graph.insert_status(NodeId(3), Status::default()).unwrap();
        place(&mut graph, 4, 10.0, 0.0);
        assert_eq!(graph.total_nodes(), 4);

        assert_eq!(graph.prune(), 2);
        assert_eq!(graph.total_nodes(), 2);
        assert!(graph.get(NodeId(1)).is_none());
        assert!(graph.get(NodeId(3)).is_none());

        // Surviving links were re-pointed at the compacted indices.
        let w = edge_weight(&graph, 2, 4).unwrap();
        assert!((w - 10.0).abs() < 1e-6);
        let four = graph.index_of(NodeId(4)).unwrap();
        assert_eq!(graph.get(NodeId(2)).unwrap().edges()[0].target, four);
    }

    #[test]
    fn prune_without_placeholders_is_a_no_op() {
        let mut graph = Graph::new();
        place(&mut graph, 1, 0.0, 0.0);
        assert_eq!(graph.prune(), 0);
        assert_eq!(graph.total_nodes(), 1);
    }
}
