use rand_pcg::Pcg64;

use crate::action::{summarize, ChildSummary};
use crate::config::Strategy;
use crate::coordinator::{run_until, Coordinator, IterationBudget, SearchReport};
use crate::deadline::Deadline;
use crate::oracle::GameOracle;
use crate::search::Policy;
use crate::tree::{Decision, Tree};

/// Single-threaded search on one tree with the first oracle.
#[derive(Debug)]
pub struct Sequential<S, M> {
    tree: Tree<S, M>,
    max_iterations: Option<u64>,
}

impl<S: Eq, M> Sequential<S, M> {
    pub fn new(state: S, max_iterations: Option<u64>) -> Self {
        Self {
            tree: Tree::new(state),
            max_iterations,
        }
    }

    pub fn tree(&self) -> &Tree<S, M> {
        &self.tree
    }
}

impl<G: GameOracle + Send> Coordinator<G> for Sequential<G::State, G::Move> {
    fn strategy(&self) -> Strategy {
        Strategy::Sequential
    }

    fn rebase(&mut self, observed: &G::State) {
        let _ = self.tree.rebase(observed.clone());
    }

    fn search(&mut self, oracles: &mut [G], policy: &Policy<G::Role>, deadline: &Deadline, rng: &mut Pcg64) -> SearchReport {
        let Some(oracle) = oracles.first_mut() else {
            return SearchReport::default();
        };
        let budget = IterationBudget::new(self.max_iterations);

        run_until(self.tree.root(), oracle, policy, deadline, &budget, rng)
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
