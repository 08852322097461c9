use std::panic;
use std::thread;

use log::debug;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::action::{merge_root_children, ChildSummary};
use crate::config::Strategy;
use crate::coordinator::{run_until, worker_seeds, Coordinator, IterationBudget, SearchReport};
use crate::deadline::Deadline;
use crate::oracle::GameOracle;
use crate::search::Policy;
use crate::tree::{Decision, Tree};

/// One private tree per worker, all rooted at the same state. Nothing is
/// shared while searching; root children are merged by state afterwards.
#[derive(Debug)]
pub struct RootParallel<S, M> {
    trees: Vec<Tree<S, M>>,
    max_iterations: Option<u64>,
}

impl<S: Clone + Eq, M> RootParallel<S, M> {
    pub fn new(state: S, workers: usize, max_iterations: Option<u64>) -> Self {
        let trees = (0..workers.max(1)).map(|_| Tree::new(state.clone())).collect();

        Self { trees, max_iterations }
    }

    pub fn trees(&self) -> &[Tree<S, M>] {
        &self.trees
    }
}

impl<G: GameOracle + Send> Coordinator<G> for RootParallel<G::State, G::Move> {
    fn strategy(&self) -> Strategy {
        Strategy::Root
    }

    fn rebase(&mut self, observed: &G::State) {
        for tree in &mut self.trees {
            let _ = tree.rebase(observed.clone());
        }
    }

    fn search(&mut self, oracles: &mut [G], policy: &Policy<G::Role>, deadline: &Deadline, rng: &mut Pcg64) -> SearchReport {
        let seeds = worker_seeds(rng, self.trees.len().min(oracles.len()));
        let budget = IterationBudget::new(self.max_iterations);

        let reports: Vec<SearchReport> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .trees
                .iter()
                .zip(oracles.iter_mut())
                .zip(seeds)
                .map(|((tree, oracle), seed)| {
                    let budget = &budget;
                    scope.spawn(move || {
                        let mut rng = Pcg64::seed_from_u64(seed);
                        run_until(tree.root(), oracle, policy, deadline, budget, &mut rng)
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
            debug!("Tree {worker} ran {} iterations", report.iterations);
            total += report;
        }
        total
    }

    /// Taken from the first tree whose root has been expanded.
    fn root_decision(&self) -> Option<Decision> {
        self.trees.iter().find_map(|tree| tree.root().decision())
    }

    fn root_children(&self) -> Vec<ChildSummary<G::State, G::Move>> {
        merge_root_children(self.trees.iter().map(Tree::root))
    }

    fn root_visits(&self) -> u64 {
        self.trees.iter().map(|tree| tree.root().visits()).sum()
    }
}
