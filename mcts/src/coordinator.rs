//! Strategies that drive the search steps over one or more workers.

mod leaf;
mod root;
mod sequential;
mod shared_tree;

use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use rand_pcg::Pcg64;

use crate::action::ChildSummary;
use crate::config::{SearchConfig, Strategy};
use crate::deadline::Deadline;
use crate::oracle::GameOracle;
use crate::search::{iterate, Iteration, Policy};
use crate::tree::{Decision, Node};
use crate::SearchError;

pub use leaf::LeafParallel;
pub use root::RootParallel;
pub use sequential::Sequential;
pub use shared_tree::TreeParallel;

/// Counters for one search call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchReport {
    /// Iterations whose rollouts reached the tree.
    pub iterations: u64,
    /// Rollouts backpropagated; more than `iterations` for leaf parallelism.
    pub rollouts: u64,
    /// Iterations skipped because the oracle failed.
    pub failed: u64,
    /// Iterations cut short by the deadline.
    pub abandoned: u64,
    pub elapsed: Duration,
}

impl SearchReport {
    fn record(&mut self, iteration: Iteration) {
        match iteration {
            Iteration::Completed => {
                self.iterations += 1;
                self.rollouts += 1;
            }
            Iteration::Abandoned => self.abandoned += 1,
            Iteration::Failed(e) => {
                warn!("Skipping search iteration: {e}");
                self.failed += 1;
            }
        }
    }
}

impl AddAssign for SearchReport {
    fn add_assign(&mut self, other: Self) {
        self.iterations += other.iterations;
        self.rollouts += other.rollouts;
        self.failed += other.failed;
        self.abandoned += other.abandoned;
        self.elapsed = self.elapsed.max(other.elapsed);
    }
}

/// Optional cap on the number of iterations started, shared by all workers of
/// one search.
#[derive(Debug)]
pub(crate) struct IterationBudget {
    limit: Option<u64>,
    started: AtomicU64,
}

impl IterationBudget {
    pub(crate) fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            started: AtomicU64::new(0),
        }
    }

    pub(crate) fn try_start(&self) -> bool {
        self.limit
            .map_or(true, |limit| self.started.fetch_add(1, Ordering::AcqRel) < limit)
    }
}

/// One way of spending a time budget on improving the root statistics.
///
/// A coordinator owns its tree (or trees) across turns; oracles are lent to
/// it for each search, one per worker.
pub trait Coordinator<G: GameOracle>: Send {
    fn strategy(&self) -> Strategy;

    /// Re-roots at the observed state, keeping matching statistics.
    fn rebase(&mut self, observed: &G::State);

    /// Searches until `deadline` is out of time or the iteration cap is hit,
    /// and joins every worker before returning.
    fn search(&mut self, oracles: &mut [G], policy: &Policy<G::Role>, deadline: &Deadline, rng: &mut Pcg64) -> SearchReport;

    fn root_decision(&self) -> Option<Decision>;

    /// Root children statistics, merged over trees where there are several.
    fn root_children(&self) -> Vec<ChildSummary<G::State, G::Move>>;

    /// Rollouts accumulated at the root, summed over trees.
    fn root_visits(&self) -> u64;
}

/// Builds the coordinator for `strategy`, rooted at `state`.
///
/// [`Strategy::Auto`] must be resolved by the caller; it is treated as
/// [`Strategy::Sequential`] here.
pub fn build<G>(strategy: Strategy, state: G::State, config: &SearchConfig, oracles: usize) -> Result<Box<dyn Coordinator<G>>, SearchError>
where
    G: GameOracle + Send + 'static,
    G::State: 'static,
    G::Move: 'static,
{
    if oracles == 0 {
        return Err(SearchError::NoOracles);
    }
    let workers = config.threads.clamp(1, oracles);
    debug!("Building {strategy:?} coordinator with {workers} workers");

    let coordinator: Box<dyn Coordinator<G>> = match strategy {
        Strategy::Sequential | Strategy::Auto => Box::new(Sequential::<G::State, G::Move>::new(state, config.max_iterations)),
        Strategy::Leaf => Box::new(LeafParallel::<G::State, G::Move>::new(state, workers, config.max_iterations)?),
        Strategy::Tree => Box::new(TreeParallel::<G::State, G::Move>::new(state, workers, config.max_iterations)),
        Strategy::Root => Box::new(RootParallel::<G::State, G::Move>::new(state, workers, config.max_iterations)),
    };
    Ok(coordinator)
}

/// Runs full iterations on one tree until time or budget runs out.
pub(crate) fn run_until<G: GameOracle>(
    root: &Arc<Node<G::State, G::Move>>,
    oracle: &mut G,
    policy: &Policy<G::Role>,
    deadline: &Deadline,
    budget: &IterationBudget,
    rng: &mut Pcg64,
) -> SearchReport {
    let started = deadline.clock().now();
    let mut report = SearchReport::default();

    while !deadline.is_out_of_time() && budget.try_start() {
        report.record(iterate(root, oracle, policy, deadline, rng));
    }

    report.elapsed = deadline.clock().now().saturating_duration_since(started);
    report
}

/// Independent generator seeds for `workers` workers.
pub(crate) fn worker_seeds(rng: &mut Pcg64, workers: usize) -> Vec<u64> {
    (0..workers).map(|_| rng.gen()).collect()
}
