//! The surface a match driver talks to: one search before the first move and
//! one bounded search per turn, reusing the tree in between.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::action::select_action;
use crate::config::{SearchConfig, Strategy};
use crate::coordinator::{self, Coordinator, SearchReport};
use crate::deadline::Deadline;
use crate::oracle::GameOracle;
use crate::probe::{probe_throughput, resolve_strategy};
use crate::search::Policy;
use crate::tree::Decision;
use crate::SearchError;

/// Plays one role of one match.
pub struct Player<G: GameOracle> {
    policy: Policy<G::Role>,
    config: SearchConfig,
    oracles: Vec<G>,
    coordinator: Option<Box<dyn Coordinator<G>>>,
    rng: Pcg64,
    turn_margin: Duration,
    turn: u32,
}

impl<G> Player<G>
where
    G: GameOracle + Send + 'static,
    G::State: 'static,
    G::Move: 'static,
{
    /// Creates a player for `agent`. Each oracle instance serves one worker.
    pub fn new(agent: G::Role, oracles: Vec<G>, config: SearchConfig) -> Result<Self, SearchError> {
        if oracles.is_empty() {
            return Err(SearchError::NoOracles);
        }

        let rng = match config.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };

        Ok(Self {
            policy: Policy {
                agent,
                exploration: config.exploration,
                epsilon: config.epsilon,
            },
            turn_margin: config.turn_margin(),
            config,
            oracles,
            coordinator: None,
            rng,
            turn: 0,
        })
    }

    /// Resolves the strategy and searches from the initial state until
    /// `deadline` runs out. The tree is kept for the first turn.
    pub fn meta_game(&mut self, initial_state: &G::State, deadline: &Deadline) -> Result<SearchReport, SearchError> {
        info!("Meta-game for {:?} with {} roles", self.policy.agent, self.oracles[0].roles().len());

        let throughput = if self.config.strategy == Strategy::Auto {
            let budget = self.config.probe_duration().min(deadline.remaining() / 2);
            let probe_deadline = Deadline::after_on(deadline.clock().clone(), budget, Duration::ZERO);
            Some(probe_throughput(&mut self.oracles[0], initial_state, &probe_deadline, &mut self.rng))
        } else {
            None
        };
        let strategy = resolve_strategy(&self.config, throughput);

        let built = self.build(strategy, initial_state)?;
        let coordinator = self.coordinator.insert(built);
        let report = coordinator.search(&mut self.oracles, &self.policy, deadline, &mut self.rng);
        info!("Meta-game search: {report:?}, root visits {}", coordinator.root_visits());

        if deadline.is_expired() {
            warn!("Meta-game ran past its timeout");
        }
        Ok(report)
    }

    /// Searches from `current_state` until `deadline` runs out and returns the
    /// move to play, always one of `legal_moves`.
    pub fn select_move(
        &mut self,
        legal_moves: &[G::Move],
        current_state: &G::State,
        deadline: &Deadline,
    ) -> Result<G::Move, SearchError> {
        if legal_moves.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }
        self.turn += 1;
        info!("Turn {} with {} legal moves", self.turn, legal_moves.len());

        let coordinator = match self.coordinator.take() {
            Some(mut coordinator) => {
                coordinator.rebase(current_state);
                self.coordinator.insert(coordinator)
            }
            None => {
                let strategy = resolve_strategy(&self.config, None);
                let built = self.build(strategy, current_state)?;
                self.coordinator.insert(built)
            }
        };
        info!("Recycled rollouts: {}", coordinator.root_visits());

        let report = coordinator.search(&mut self.oracles, &self.policy, deadline, &mut self.rng);
        info!("Search: {report:?}, root visits {}", coordinator.root_visits());

        let decision = coordinator.root_decision();
        let children = coordinator.root_children();
        log_root(decision, &children);

        let chosen = select_action(decision, &children, legal_moves, self.config.min_visits).ok_or(SearchError::NoLegalMoves)?;

        if deadline.is_expired() {
            self.turn_margin += Duration::from_millis(self.config.margin_step_ms);
            warn!("Turn {} ran past its timeout, margin is now {:?}", self.turn, self.turn_margin);
        }
        Ok(chosen)
    }

    /// Deadline for a turn that must be answered by `timeout`, keeping the
    /// current safety margin.
    pub fn turn_deadline(&self, timeout: Instant) -> Deadline {
        Deadline::new(timeout, timeout.checked_sub(self.turn_margin).unwrap_or(timeout))
    }

    /// Deadline for a meta-game that must end by `timeout`.
    pub fn meta_game_deadline(&self, timeout: Instant) -> Deadline {
        let margin = self.config.meta_game_margin();
        Deadline::new(timeout, timeout.checked_sub(margin).unwrap_or(timeout))
    }

    pub fn turn_margin(&self) -> Duration {
        self.turn_margin
    }

    /// The strategy in use, once the first search has run.
    pub fn strategy(&self) -> Option<Strategy> {
        self.coordinator.as_ref().map(|c| c.strategy())
    }

    pub fn coordinator(&self) -> Option<&dyn Coordinator<G>> {
        self.coordinator.as_deref()
    }

    pub fn oracles_mut(&mut self) -> &mut [G] {
        &mut self.oracles
    }

    fn build(&self, strategy: Strategy, state: &G::State) -> Result<Box<dyn Coordinator<G>>, SearchError> {
        info!("Using {strategy:?} search with {} oracle instances", self.oracles.len());
        coordinator::build(strategy, state.clone(), &self.config, self.oracles.len())
    }
}

fn log_root<S, M: std::fmt::Debug>(decision: Option<Decision>, children: &[crate::action::ChildSummary<S, M>]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let kind = match decision {
        Some(Decision::Min) => "min",
        _ => "max",
    };
    debug!("-----");
    debug!("root {kind}, {} children", children.len());
    for child in children {
        debug!("\t({:.2}/{}) {:?}", child.value().unwrap_or(0.0), child.visits, child.action);
    }
    debug!("-----");
}
