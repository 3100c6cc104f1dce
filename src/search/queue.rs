//! Open-node priority queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::Node;
use crate::settings::NodeSelection;

/// Entry in the node queue with its selection priority.
struct QueuedNode {
    node: Node,
    priority: f64, // Higher = selected first
}

impl PartialEq for QueuedNode {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for QueuedNode {}

impl PartialOrd for QueuedNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .partial_cmp(&other.priority)
            .unwrap_or(Ordering::Equal)
    }
}

/// Priority queue over the open nodes.
pub struct NodeQueue {
    /// Node selection strategy.
    strategy: NodeSelection,

    /// Max-heap by priority.
    heap: BinaryHeap<QueuedNode>,

    /// Nodes popped so far (drives hybrid diving).
    nodes_popped: u64,

    /// Best (lowest) lower bound among queued nodes.
    best_bound: f64,
}

impl NodeQueue {
    /// Create a queue with the given selection strategy.
    pub fn new(strategy: NodeSelection) -> Self {
        Self {
            strategy,
            heap: BinaryHeap::new(),
            nodes_popped: 0,
            best_bound: f64::INFINITY,
        }
    }

    /// Add a node.
    pub fn push(&mut self, node: Node) {
        let priority = self.compute_priority(&node);
        if node.lower < self.best_bound {
            self.best_bound = node.lower;
        }
        self.heap.push(QueuedNode { node, priority });
    }

    /// Pop the next node per the selection strategy.
    pub fn pop(&mut self) -> Option<Node> {
        let queued = self.heap.pop()?;
        self.nodes_popped += 1;
        self.recompute_best_bound();
        Some(queued.node)
    }

    /// Best (lowest) lower bound among queued nodes (+inf when empty).
    pub fn best_bound(&self) -> f64 {
        self.best_bound
    }

    /// Drop nodes whose lower bound reaches the cutoff bound.
    ///
    /// Returns the number of pruned nodes.
    pub fn prune_by_bound(&mut self, cutoff_bound: f64) -> usize {
        let before = self.heap.len();
        let remaining: Vec<QueuedNode> = self
            .heap
            .drain()
            .filter(|q| !q.node.can_prune(cutoff_bound))
            .collect();
        self.heap = remaining.into_iter().collect();
        self.recompute_best_bound();
        before - self.heap.len()
    }

    /// Whether no nodes are open.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of open nodes.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Drop everything (restart).
    pub fn clear(&mut self) {
        self.heap.clear();
        self.best_bound = f64::INFINITY;
    }

    fn compute_priority(&self, node: &Node) -> f64 {
        match self.strategy {
            NodeSelection::BestBound => -node.lower,
            NodeSelection::DepthFirst => node.depth as f64,
            NodeSelection::BestEstimate => -node.estimate,
            NodeSelection::Hybrid { dive_freq } => {
                if dive_freq > 0 && self.nodes_popped % dive_freq as u64 == 0 {
                    node.depth as f64
                } else {
                    -node.lower
                }
            }
        }
    }

    fn recompute_best_bound(&mut self) {
        self.best_bound = self
            .heap
            .iter()
            .map(|q| q.node.lower)
            .fold(f64::INFINITY, f64::min);
    }
}
