//! Search tree bookkeeping: open nodes, the focus node, lower-bound
//! accounting, and child creation.

use std::rc::Rc;

use super::{BranchDecision, Node, NodeQueue, NodeStatus};
use crate::model::{BoundChange, BoundDir, ChangeReason, DomainState};
use crate::relax::RelaxState;
use crate::settings::NodeSelection;

/// The search tree.
///
/// Owns the open-node queue and hands out exactly one focus node at a
/// time. Lower bounds only ever move up; the tree's bound is the minimum
/// over all open nodes.
pub struct SearchTree {
    /// Open nodes.
    queue: NodeQueue,

    /// Next node ID to assign (0 is the root).
    next_node_id: u64,

    /// Nodes created.
    n_created: u64,

    /// Nodes pruned against the cutoff bound.
    n_pruned: u64,

    /// Nodes that turned out infeasible.
    n_infeasible: u64,

    /// Nodes branched.
    n_branched: u64,
}

impl SearchTree {
    /// Create an empty tree.
    pub fn new(strategy: NodeSelection) -> Self {
        Self {
            queue: NodeQueue::new(strategy),
            next_node_id: 1,
            n_created: 0,
            n_pruned: 0,
            n_infeasible: 0,
            n_branched: 0,
        }
    }

    /// Enqueue the root node.
    pub fn init_root(&mut self) {
        let root = Node::root();
        self.n_created += 1;
        self.queue.push(root);
    }

    /// Select the next node to focus.
    ///
    /// Nodes lying in already-cut-off subtrees (lower bound at or above
    /// the cutoff bound) are skipped and counted as pruned.
    pub fn select_next(&mut self, cutoff_bound: f64) -> Option<Node> {
        while let Some(mut node) = self.queue.pop() {
            if node.can_prune(cutoff_bound) {
                self.n_pruned += 1;
                continue;
            }
            node.status = NodeStatus::Focus;
            return Some(node);
        }
        None
    }

    /// Put a node back into the queue (e.g. a child).
    pub fn enqueue(&mut self, node: Node) {
        self.queue.push(node);
    }

    /// Create and enqueue the two children of a branching decision.
    ///
    /// `trail` holds the reductions found while the parent was in focus;
    /// both children inherit it ahead of their own branching change.
    /// Child lower bounds start at the parent's refined bound; estimates
    /// may be sharpened by the caller before enqueueing, so they are
    /// returned by id.
    ///
    /// `parent_obj` is the parent's relaxation objective (feeds the
    /// children's pseudocost observation on their first solve) and `warm`
    /// the backend state captured at the parent.
    pub fn branch(
        &mut self,
        parent: &Node,
        trail: &[BoundChange],
        decision: &BranchDecision,
        domains: &DomainState,
        estimates: (f64, f64),
        parent_obj: Option<f64>,
        warm: Option<Rc<RelaxState>>,
    ) -> (u64, u64) {
        let down_id = self.next_node_id;
        let up_id = self.next_node_id + 1;
        self.next_node_id += 2;

        let mut down_extra = trail.to_vec();
        down_extra.push(BoundChange {
            var: decision.var,
            dir: BoundDir::Upper,
            old: domains.ub(decision.var),
            new: decision.down_ub,
            reason: ChangeReason::Branching,
        });
        let mut down = parent.child(down_id, down_extra);
        down.estimate = estimates.0.max(down.lower);
        down.branch_gain = parent_obj.map(|o| (o, decision.value - decision.down_ub));
        down.warm_start = warm.clone();

        let mut up_extra = trail.to_vec();
        up_extra.push(BoundChange {
            var: decision.var,
            dir: BoundDir::Lower,
            old: domains.lb(decision.var),
            new: decision.up_lb,
            reason: ChangeReason::Branching,
        });
        let mut up = parent.child(up_id, up_extra);
        up.estimate = estimates.1.max(up.lower);
        up.branch_gain = parent_obj.map(|o| (o, decision.up_lb - decision.value));
        up.warm_start = warm;

        self.queue.push(down);
        self.queue.push(up);
        self.n_created += 2;
        self.n_branched += 1;

        (down_id, up_id)
    }

    /// Drop open nodes dominated by a new cutoff bound.
    pub fn prune_by_bound(&mut self, cutoff_bound: f64) -> usize {
        let pruned = self.queue.prune_by_bound(cutoff_bound);
        self.n_pruned += pruned as u64;
        pruned
    }

    /// Mark that a focus node ended infeasible.
    pub fn count_infeasible(&mut self) {
        self.n_infeasible += 1;
    }

    /// Lower bound over all open nodes (+inf when the tree is exhausted).
    pub fn lower_bound(&self) -> f64 {
        self.queue.best_bound()
    }

    /// Number of open nodes.
    pub fn num_open(&self) -> usize {
        self.queue.len()
    }

    /// Whether no nodes remain.
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }

    /// Nodes created so far.
    pub fn num_created(&self) -> u64 {
        self.n_created
    }

    /// Nodes pruned so far.
    pub fn num_pruned(&self) -> u64 {
        self.n_pruned
    }

    /// Nodes found infeasible so far.
    pub fn num_infeasible(&self) -> u64 {
        self.n_infeasible
    }

    /// Branchings performed so far.
    pub fn num_branched(&self) -> u64 {
        self.n_branched
    }

    /// Discard the tree and start over from a fresh root (restart).
    pub fn restart(&mut self) {
        self.queue.clear();
        self.init_root();
    }
}
