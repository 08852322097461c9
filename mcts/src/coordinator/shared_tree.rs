use std::panic;
use std::sync::Arc;
use std::thread;

use log::debug;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::action::{summarize, ChildSummary};
use crate::config::Strategy;
use crate::coordinator::{run_until, worker_seeds, Coordinator, IterationBudget, SearchReport};
use crate::deadline::Deadline;
use crate::oracle::GameOracle;
use crate::search::Policy;
use crate::tree::{Decision, Tree};

/// Every worker runs complete iterations against the same tree for the whole
/// budget. Node statistics are atomic and expansion is claimed by a single
/// worker, so no update is lost.
#[derive(Debug)]
pub struct TreeParallel<S, M> {
    tree: Tree<S, M>,
    workers: usize,
    max_iterations: Option<u64>,
}

impl<S: Eq, M> TreeParallel<S, M> {
    pub fn new(state: S, workers: usize, max_iterations: Option<u64>) -> Self {
        Self {
            tree: Tree::new(state),
            workers: workers.max(1),
            max_iterations,
        }
    }

    pub fn tree(&self) -> &Tree<S, M> {
        &self.tree
    }
}

impl<G: GameOracle + Send> Coordinator<G> for TreeParallel<G::State, G::Move> {
    fn strategy(&self) -> Strategy {
        Strategy::Tree
    }

    fn rebase(&mut self, observed: &G::State) {
        let _ = self.tree.rebase(observed.clone());
    }

    fn search(&mut self, oracles: &mut [G], policy: &Policy<G::Role>, deadline: &Deadline, rng: &mut Pcg64) -> SearchReport {
        let workers = self.workers.min(oracles.len());
        let seeds = worker_seeds(rng, workers);
        let budget = IterationBudget::new(self.max_iterations);
        let root = Arc::clone(self.tree.root());

        let reports: Vec<SearchReport> = thread::scope(|scope| {
            let handles: Vec<_> = oracles
                .iter_mut()
                .zip(seeds)
                .map(|(oracle, seed)| {
                    let (root, budget) = (&root, &budget);
                    scope.spawn(move || {
                        let mut rng = Pcg64::seed_from_u64(seed);
                        run_until(root, oracle, policy, deadline, budget, &mut rng)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                .collect()
        });

        let mut total = SearchReport::default();
        for (worker, report) in reports.into_iter().enumerate() {
            debug!("Worker {worker} ran {} iterations", report.iterations);
            total += report;
        }
        total
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
