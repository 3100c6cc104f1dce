//! Configuration settings for the solving loop.

/// Node selection strategy for the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Always select the open node with the best (lowest) lower bound.
    #[default]
    BestBound,

    /// Depth-first search (helps find feasible solutions quickly).
    DepthFirst,

    /// Select by estimated objective value.
    BestEstimate,

    /// Hybrid: alternate between diving and best-bound.
    Hybrid {
        /// How often to dive (every N selections).
        dive_freq: usize,
    },
}

/// Solving-loop settings.
///
/// Groups termination criteria, round caps for the node-processing phases,
/// separation knobs, and the restart policy. All tolerances follow the
/// minimization convention used throughout the crate.
#[derive(Debug, Clone)]
pub struct SolveSettings {
    // === Termination criteria ===
    /// Maximum number of nodes to process in the current search tree.
    pub node_limit: u64,

    /// Maximum number of nodes across all restarts.
    pub total_node_limit: u64,

    /// Maximum nodes processed since the last incumbent improvement.
    pub stall_node_limit: u64,

    /// Time limit in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// Approximate memory limit in kilobytes (None = unlimited).
    pub mem_limit_kb: Option<u64>,

    /// Relative optimality gap tolerance.
    /// Stop when (upper - lower) / |upper| <= gap_rel_tol.
    pub gap_rel_tol: f64,

    /// Absolute optimality gap tolerance.
    pub gap_abs_tol: f64,

    /// Stop after this many feasible solutions (None = unlimited).
    pub sol_limit: Option<u64>,

    /// Stop after this many incumbent improvements (None = unlimited).
    pub best_sol_limit: Option<u64>,

    /// Integer feasibility tolerance.
    /// A value is considered integral if |x - round(x)| <= int_feas_tol.
    pub int_feas_tol: f64,

    // === Search strategy ===
    /// Node selection strategy.
    pub node_selection: NodeSelection,

    // === Node-loop caps ===
    /// Maximum passes of the inner node-processing loop per node.
    pub max_node_passes: u32,

    /// Maximum domain propagation rounds per invocation.
    pub max_prop_rounds: u32,

    /// Maximum relaxation-solve errors tolerated per solve call before
    /// the node falls back to pseudo-solution handling.
    pub max_relax_errors: u32,

    /// Total relaxation-solve errors tolerated across the whole run
    /// before aborting as fatal.
    pub max_total_relax_errors: u64,

    /// Iteration limit handed to each relaxation solve (None = unlimited).
    pub relax_iter_limit: Option<u64>,

    // === Pricing ===
    /// Maximum pricing rounds per relaxation loop.
    pub max_price_rounds: u32,

    /// Maximum columns flushed from the pricing store per round.
    pub max_price_cols: usize,

    // === Separation ===
    /// Maximum separation rounds per node.
    pub sepa_max_rounds: u32,

    /// Maximum cuts applied per separation round.
    pub sepa_cuts_per_round: usize,

    /// Only separate when the node's lower bound is within this relative
    /// distance of the global lower bound (1.0 = separate everywhere,
    /// 0.0 = only at the best-bound node).
    pub sepa_maxbounddist: f64,

    /// Minimum efficacy for a non-forced cut to enter the store.
    pub sepa_min_efficacy: f64,

    /// Relative objective improvement below which a round counts as stalling.
    pub sepa_stall_obj_tol: f64,

    /// Abort separation after this many consecutive stalling rounds.
    pub sepa_max_stall_rounds: u32,

    // === Cut pool ===
    /// Evict a pool cut after this many consecutive rounds without violation.
    pub pool_max_age: u32,

    /// Violation tolerance when separating the cut pools.
    pub pool_violation_tol: f64,

    // === Conflict analysis / restarts ===
    /// Maximum literals in a stored conflict (longer conflicts are dropped).
    pub conflict_max_len: usize,

    /// Maximum number of restarts (0 disables restarting).
    pub max_restarts: u32,

    /// Restart once this many conflicts were found since the last restart.
    pub conflict_restart_base: u64,

    /// Geometric growth of the conflict restart threshold per restart.
    pub conflict_restart_factor: f64,

    /// Restart when this fraction of integer variables got fixed at the root.
    pub root_fixing_restart_frac: f64,

    // === Output ===
    /// Log a progress line every N nodes.
    pub log_freq: u64,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            // Termination
            node_limit: u64::MAX,
            total_node_limit: u64::MAX,
            stall_node_limit: u64::MAX,
            time_limit_ms: None,
            mem_limit_kb: None,
            gap_rel_tol: 1e-6,
            gap_abs_tol: 1e-9,
            sol_limit: None,
            best_sol_limit: None,
            int_feas_tol: 1e-6,

            // Search
            node_selection: NodeSelection::default(),

            // Node loop
            max_node_passes: 10_000,
            max_prop_rounds: 100,
            max_relax_errors: 3,
            max_total_relax_errors: 1000,
            relax_iter_limit: None,

            // Pricing
            max_price_rounds: 100,
            max_price_cols: 100,

            // Separation
            sepa_max_rounds: 20,
            sepa_cuts_per_round: 100,
            sepa_maxbounddist: 1.0,
            sepa_min_efficacy: 1e-4,
            sepa_stall_obj_tol: 1e-4,
            sepa_max_stall_rounds: 5,

            // Cut pool
            pool_max_age: 100,
            pool_violation_tol: 1e-7,

            // Conflicts / restarts
            conflict_max_len: 10,
            max_restarts: 3,
            conflict_restart_base: 1000,
            conflict_restart_factor: 2.0,
            root_fixing_restart_frac: 0.1,

            // Output
            log_freq: 100,
        }
    }
}

impl SolveSettings {
    /// Set the time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_ms = Some((seconds * 1000.0) as u64);
        self
    }

    /// Set the node limit.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = nodes;
        self
    }

    /// Set the relative optimality gap tolerance.
    pub fn with_gap_tol(mut self, tol: f64) -> Self {
        self.gap_rel_tol = tol;
        self
    }

    /// Set the node selection strategy.
    pub fn with_node_selection(mut self, sel: NodeSelection) -> Self {
        self.node_selection = sel;
        self
    }

    /// Disable restarting entirely.
    pub fn without_restarts(mut self) -> Self {
        self.max_restarts = 0;
        self
    }
}
