use log::{trace, warn};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::action::{summarize, ChildSummary};
use crate::config::Strategy;
use crate::coordinator::{worker_seeds, Coordinator, IterationBudget, SearchReport};
use crate::deadline::Deadline;
use crate::oracle::GameOracle;
use crate::search::{expand, select, simulate, Policy};
use crate::tree::{backpropagate, Decision, Tree};
use crate::SearchError;

/// One tree grown by the coordinating thread; every wave fires one rollout
/// per worker from the freshly expanded node and folds their sum back in a
/// single backpropagation.
///
/// Workers never touch the tree, they only read the frontier state.
pub struct LeafParallel<S, M> {
    tree: Tree<S, M>,
    pool: ThreadPool,
    workers: usize,
    max_iterations: Option<u64>,
}

impl<S: Eq, M> LeafParallel<S, M> {
    pub fn new(state: S, workers: usize, max_iterations: Option<u64>) -> Result<Self, SearchError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("mcts-leaf-{index}"))
            .build()?;

        Ok(Self {
            tree: Tree::new(state),
            pool,
            workers,
            max_iterations,
        })
    }

    pub fn tree(&self) -> &Tree<S, M> {
        &self.tree
    }
}

impl<G: GameOracle + Send> Coordinator<G> for LeafParallel<G::State, G::Move> {
    fn strategy(&self) -> Strategy {
        Strategy::Leaf
    }

    fn rebase(&mut self, observed: &G::State) {
        let _ = self.tree.rebase(observed.clone());
    }

    fn search(&mut self, oracles: &mut [G], policy: &Policy<G::Role>, deadline: &Deadline, rng: &mut Pcg64) -> SearchReport {
        let workers = self.workers.min(oracles.len());
        let started = deadline.clock().now();
        let budget = IterationBudget::new(self.max_iterations);
        let mut report = SearchReport::default();
        if workers == 0 {
            return report;
        }

        while !deadline.is_out_of_time() && budget.try_start() {
            let frontier = select(self.tree.root(), policy.exploration, policy.epsilon, rng);
            if deadline.is_out_of_time() {
                report.abandoned += 1;
                break;
            }
            let leaf = match expand(&frontier, &mut oracles[0], &policy.agent, rng) {
                Ok(leaf) => leaf,
                Err(e) => {
                    warn!("Skipping search iteration: {e}");
                    report.failed += 1;
                    continue;
                }
            };
            if deadline.is_out_of_time() {
                report.abandoned += 1;
                break;
            }

            let seeds = worker_seeds(rng, workers);
            let state = leaf.state();
            let agent = &policy.agent;
            let results: Vec<_> = self.pool.install(|| {
                oracles[..workers]
                    .par_iter_mut()
                    .zip(seeds)
                    .map(|(oracle, seed)| {
                        let mut rng = Pcg64::seed_from_u64(seed);
                        simulate(state, oracle, agent, &mut rng)
                    })
                    .collect()
            });

            let mut reward_sum = 0u64;
            let mut rollouts = 0u64;
            for result in results {
                match result {
                    Ok(reward) => {
                        reward_sum += u64::from(reward);
                        rollouts += 1;
                    }
                    Err(e) => warn!("Dropping failed rollout: {e}"),
                }
            }

            if rollouts == 0 {
                report.failed += 1;
                continue;
            }
            trace!("Wave of {rollouts} rollouts scored {reward_sum}");
            backpropagate(&leaf, reward_sum, rollouts);
            report.iterations += 1;
            report.rollouts += rollouts;
        }

        report.elapsed = deadline.clock().now().saturating_duration_since(started);
        report
    }

    fn root_decision(&self) -> Option<Decision> {
        self.tree.root().decision()
    }

    fn root_children(&self) -> Vec<ChildSummary<G::State, G::Move>> {
        summarize(self.tree.root())
    }

    fn root_visits(&self) -> u64 {
        self.tree.root().visits()
    }
}
