//! Human-readable results.

use std::fmt;

use crate::graph::Graph;
use crate::node::{NodeId, Status};
use crate::search::BadNodeSet;

/// Outcome of the correction search.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Verdict {
    AllInPosition,
    /// More than half the swarm would have to move.
    TooManyChanges { flagged: usize, total: usize },
    Relocate(Vec<NodeId>),
}

impl Verdict {
    pub fn from_bad_nodes(bad: &BadNodeSet, total_nodes: usize) -> Self {
        if bad.is_empty() {
            Self::AllInPosition
        } else if bad.len() > total_nodes / 2 {
            Self::TooManyChanges {
                flagged: bad.len(),
                total: total_nodes,
            }
        } else {
            Self::Relocate(bad.iter().collect())
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllInPosition => writeln!(f, "ALL NODES IN POSITION"),
            Self::TooManyChanges { .. } => writeln!(f, "TOO MANY CHANGES REQUIRED"),
            Self::Relocate(ids) => {
                for id in ids {
                    writeln!(f, "relocate/remove node #{id}")?;
                }
                Ok(())
            }
        }
    }
}

/// A node whose health is at or below the threshold, or unknown.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LowStatus {
    pub id: NodeId,
    pub status: Option<Status>,
}

/// Nodes whose reported health is at or below a percentage of maximum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LowStatusReport {
    pub threshold: f64,
    pub entries: Vec<LowStatus>,
}

impl LowStatusReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for LowStatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LOW STATUS NODES (≤ {}%)", self.threshold)?;
        for entry in &self.entries {
            match &entry.status {
                None => writeln!(f, "node #{}: no status", entry.id)?,
                Some(status) => writeln!(
                    f,
                    "node #{}: {}/{} hp",
                    entry.id, status.hp, status.max_hp
                )?,
            }
        }
        Ok(())
    }
}

impl Graph {
    /// Verdict for the last [`analyze`](Self::analyze).
    pub fn report(&self) -> Verdict {
        Verdict::from_bad_nodes(self.bad_nodes(), self.total_nodes())
    }

    /// Every node with no status, or with health at or below
    /// `threshold_percent`. A zero maximum counts as low.
    pub fn low_status_report(&self, threshold_percent: f64) -> LowStatusReport {
        let entries = self
            .nodes()
            .filter(|node| match node.status() {
                None => true,
                Some(status) => status
                    .health_percent()
                    .map_or(true, |pct| pct <= threshold_percent),
            })
            .map(|node| LowStatus {
                id: node.id(),
                status: node.status().copied(),
            })
            .collect();

        LowStatusReport {
            threshold: threshold_percent,
            entries,
        }
    }
}
