//! Pluggable-strategy contracts and the plugin registry.
//!
//! Every strategy the loop calls into (propagators, separators, constraint
//! handlers, pricers, heuristics, branching rules) is a trait object
//! registered here. Within a kind, callbacks run in a stable order sorted
//! by descending priority; ties keep registration order.

mod branchrule;
mod conshdlr;
mod heuristic;
mod integrality;
mod linear;
mod pricer;
mod propagator;
mod rounding;
mod separator;

pub use branchrule::{BranchCtx, BranchResult, BranchRule, PseudocostBranching};
pub use conshdlr::{ConstraintHandler, EnforceCtx, EnforceResult};
pub use heuristic::{HeurCtx, HeurTiming, Heuristic};
pub use integrality::IntegralityHandler;
pub use linear::LinearHandler;
pub use pricer::{PriceCtx, PriceResult, Priced, Pricer};
pub use propagator::{PropCtx, PropResult, PropTiming, Propagator};
pub use rounding::RoundingHeuristic;
pub use separator::{SepaCtx, SepaResult, Separator};

/// Registry of all pluggable strategies.
#[derive(Default)]
pub struct Plugins {
    /// Domain propagators, sorted by descending priority.
    pub propagators: Vec<Box<dyn Propagator>>,

    /// Constraint handlers, sorted by descending priority.
    pub conshdlrs: Vec<Box<dyn ConstraintHandler>>,

    /// Separators, sorted by descending priority.
    pub separators: Vec<Box<dyn Separator>>,

    /// Pricers, sorted by descending priority.
    pub pricers: Vec<Box<dyn Pricer>>,

    /// Primal heuristics, sorted by descending priority.
    pub heuristics: Vec<Box<dyn Heuristic>>,

    /// Branching rules, sorted by descending priority.
    pub branchrules: Vec<Box<dyn BranchRule>>,
}

fn insert_sorted<T, F: Fn(&T) -> i32>(vec: &mut Vec<Box<T>>, item: Box<T>, prio: F)
where
    T: ?Sized,
{
    vec.push(item);
    vec.sort_by_key(|p| std::cmp::Reverse(prio(p)));
}

impl Plugins {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a propagator.
    pub fn add_propagator(&mut self, prop: Box<dyn Propagator>) {
        insert_sorted(&mut self.propagators, prop, |p| p.priority());
    }

    /// Register a constraint handler.
    pub fn add_conshdlr(&mut self, hdlr: Box<dyn ConstraintHandler>) {
        insert_sorted(&mut self.conshdlrs, hdlr, |h| h.priority());
    }

    /// Register a separator.
    pub fn add_separator(&mut self, sepa: Box<dyn Separator>) {
        insert_sorted(&mut self.separators, sepa, |s| s.priority());
    }

    /// Register a pricer.
    pub fn add_pricer(&mut self, pricer: Box<dyn Pricer>) {
        insert_sorted(&mut self.pricers, pricer, |p| p.priority());
    }

    /// Register a primal heuristic.
    pub fn add_heuristic(&mut self, heur: Box<dyn Heuristic>) {
        insert_sorted(&mut self.heuristics, heur, |h| h.priority());
    }

    /// Register a branching rule.
    pub fn add_branchrule(&mut self, rule: Box<dyn BranchRule>) {
        insert_sorted(&mut self.branchrules, rule, |r| r.priority());
    }

    /// Whether any pricer is registered (suppresses restarts).
    pub fn has_pricers(&self) -> bool {
        !self.pricers.is_empty()
    }
}
