//! Swarm spatial graph
//!
//! Builds a weighted graph from swarm telemetry and finds the smallest set of
//! units that must move so that every unit keeps a second, independent relay
//! route.
//!
//! # Link rules
//!
//! Two units are linked when both have a position and:
//! - their altitude difference is at most 15 m,
//! - their 3-D separation is at most 15 m,
//! - and that separation is above 1.143 m.
//!
//! Pairs at or below the minimum separation are *degenerate*: they get no
//! link and are excluded from connectivity analysis entirely.
//!
//! # Analysis
//!
//! [`Graph::analyze`] probes every unit from every candidate root (see
//! [`ProbeState`]) and keeps the smallest set of single-route units found.
//! [`Graph::report`] turns that set into a [`Verdict`].
//!
//! ```
//! use swarmmap_graph::{Graph, NodeId, Position, Verdict};
//!
//! let mut graph = Graph::new();
//! graph.insert_position(NodeId(1), Position::new(0.0, 0.0, 0.0)).unwrap();
//! graph.prune();
//! graph.analyze();
//! assert_eq!(graph.report(), Verdict::AllInPosition);
//! ```

mod config;
mod error;
mod graph;
mod node;
mod position;
mod probe;
mod report;
mod search;

pub use config::{
    GraphConfig, ALTITUDE_SCALE, HEAVY_WEIGHT, MAX_ALTITUDE_DELTA, MAX_RANGE, MIN_SEPARATION,
};
pub use error::{Error, Payload, Result};
pub use graph::{Graph, Link};
pub use node::{Edge, Node, NodeId, NodeIndex, Status};
pub use position::{haversine, Fix, Position, EARTH_RADIUS_M, MAX_ALTITUDE};
pub use probe::{ProbeState, UNREACHED};
pub use report::{LowStatus, LowStatusReport, Verdict};
pub use search::BadNodeSet;
