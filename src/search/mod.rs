//! Search tree: nodes, the open-node queue, branching candidates, and
//! pseudocost statistics.

mod candidates;
mod node;
mod pseudocost;
mod queue;
mod tree;

pub use candidates::{BranchCandidates, BranchDecision, Candidate};
pub use node::{Node, NodeStatus};
pub use pseudocost::PseudocostStore;
pub use queue::NodeQueue;
pub use tree::SearchTree;
