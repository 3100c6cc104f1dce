//! Search node representation.

use std::rc::Rc;

use crate::model::{BoundChange, BoundDir};
use crate::relax::RelaxState;

/// Status of a search node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Node is waiting in the queue.
    Pending,

    /// Node is the current focus node.
    Focus,

    /// Node was pruned against the cutoff bound.
    Pruned,

    /// Node's subproblem is infeasible.
    Infeasible,

    /// Node produced a feasible solution (leaf).
    Feasible,

    /// Node was branched (children created).
    Branched,
}

/// A node in the search tree.
///
/// A node is defined by its cumulative bound-change path from the root.
/// Its lower bound is a valid dual bound for the whole subtree and is
/// non-decreasing as the node is refined; it never falls below the
/// parent's lower bound.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique node identifier.
    pub id: u64,

    /// Parent node ID (None for the root).
    pub parent_id: Option<u64>,

    /// Depth in the tree (0 for the root).
    pub depth: usize,

    /// Cumulative bound changes from the root to this node.
    pub path: Vec<BoundChange>,

    /// Lower (dual) bound valid for this subtree.
    pub lower: f64,

    /// Estimate of the best objective reachable in this subtree.
    pub estimate: f64,

    /// Processing status.
    pub status: NodeStatus,

    /// Variable and direction of the branching that created this node.
    pub branch: Option<(usize, BoundDir)>,

    /// Branching bookkeeping consumed on the node's first relaxation
    /// solve: (parent objective, branched fraction). Feeds pseudocosts.
    pub branch_gain: Option<(f64, f64)>,

    /// Warm-start state captured at the parent, if the backend supports it.
    pub warm_start: Option<Rc<RelaxState>>,
}

impl Node {
    /// Create the root node.
    pub fn root() -> Self {
        Self {
            id: 0,
            parent_id: None,
            depth: 0,
            path: Vec::new(),
            lower: f64::NEG_INFINITY,
            estimate: f64::NEG_INFINITY,
            status: NodeStatus::Pending,
            branch: None,
            branch_gain: None,
            warm_start: None,
        }
    }

    /// Create a child extending this node's path.
    ///
    /// `extra` must contain at least the branching change; the child
    /// inherits the parent's lower bound and estimate until refined.
    pub fn child(&self, id: u64, extra: Vec<BoundChange>) -> Self {
        let mut path = self.path.clone();
        let branch = extra
            .last()
            .map(|c| (c.var, c.dir));
        path.extend(extra);
        Self {
            id,
            parent_id: Some(self.id),
            depth: self.depth + 1,
            path,
            lower: self.lower,
            estimate: self.estimate,
            status: NodeStatus::Pending,
            branch,
            branch_gain: None,
            warm_start: None,
        }
    }

    /// Raise the node's lower bound. Bounds only move up.
    pub fn update_lower(&mut self, bound: f64) {
        if bound > self.lower {
            self.lower = bound;
        }
    }

    /// Whether the node can be pruned against a cutoff bound.
    pub fn can_prune(&self, cutoff_bound: f64) -> bool {
        self.lower >= cutoff_bound - 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeReason;

    fn change(var: usize, dir: BoundDir, new: f64) -> BoundChange {
        BoundChange { var, dir, old: 0.0, new, reason: ChangeReason::Branching }
    }

    #[test]
    fn test_root_node() {
        let root = Node::root();
        assert_eq!(root.id, 0);
        assert!(root.parent_id.is_none());
        assert_eq!(root.depth, 0);
        assert!(root.path.is_empty());
        assert_eq!(root.status, NodeStatus::Pending);
    }

    #[test]
    fn test_child_inherits_path_and_bound() {
        let mut root = Node::root();
        root.lower = 5.0;
        root.path.push(change(0, BoundDir::Lower, 1.0));

        let child = root.child(1, vec![change(1, BoundDir::Upper, 3.0)]);
        assert_eq!(child.depth, 1);
        assert_eq!(child.path.len(), 2);
        assert_eq!(child.lower, 5.0);
        assert_eq!(child.branch, Some((1, BoundDir::Upper)));
    }

    #[test]
    fn test_lower_bound_monotone() {
        let mut node = Node::root();
        node.update_lower(3.0);
        assert_eq!(node.lower, 3.0);
        // Weaker bound is ignored.
        node.update_lower(2.0);
        assert_eq!(node.lower, 3.0);
        node.update_lower(4.0);
        assert_eq!(node.lower, 4.0);
    }

    #[test]
    fn test_pruning() {
        let mut node = Node::root();
        node.lower = 10.0;

        assert!(!node.can_prune(15.0));
        assert!(node.can_prune(10.0));
        assert!(node.can_prune(8.0));
    }
}
