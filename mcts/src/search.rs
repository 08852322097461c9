//! Selection, expansion and simulation, the steps every coordinator repeats.

use std::collections::HashSet;
use std::sync::Arc;

use log::{trace, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::deadline::Deadline;
use crate::oracle::{GameOracle, OracleError};
use crate::tree::{backpropagate, Decision, Node};

/// What the search optimizes for and how boldly it explores.
#[derive(Debug, Clone)]
pub struct Policy<R> {
    /// The role the search plays for.
    pub agent: R,
    pub exploration: f64,
    pub epsilon: f64,
}

/// How one pass of select, expand, simulate and backpropagate ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// A rollout was folded into the tree.
    Completed,
    /// Time ran out between steps; nothing was recorded.
    Abandoned,
    /// The oracle rejected a move or transition; nothing was recorded.
    Failed(OracleError),
}

/// Confidence bound used to rank a visited child.
///
/// Children of a [`Decision::Max`] node get an upper bound, children of a
/// [`Decision::Min`] node the negated lower bound, so the arg-max always
/// picks the most promising move for whoever is choosing.
pub fn selection_score(decision: Decision, parent_visits: u64, child_visits: u64, child_value: f64, exploration: f64) -> f64 {
    let bonus = exploration * ((parent_visits as f64).ln() / child_visits as f64).sqrt();
    match decision {
        Decision::Max => child_value + bonus,
        Decision::Min => -(child_value - bonus),
    }
}

/// Descends from `root` to the node to expand next.
pub fn select<S, M, R: Rng + ?Sized>(root: &Arc<Node<S, M>>, exploration: f64, epsilon: f64, rng: &mut R) -> Arc<Node<S, M>> {
    let mut node = Arc::clone(root);

    loop {
        let children = node.children();
        if children.is_empty() || node.visits() == 0 {
            return node;
        }

        if let Some(unvisited) = children.iter().find(|child| child.visits() == 0) {
            return Arc::clone(unvisited);
        }

        let next = if rng.gen_bool(epsilon.clamp(0.0, 1.0)) {
            children.choose(rng).map(Arc::clone)
        } else {
            best_child(&node, exploration)
        };

        match next {
            Some(next) => node = next,
            None => return node,
        }
    }
}

fn best_child<S, M>(node: &Node<S, M>, exploration: f64) -> Option<Arc<Node<S, M>>> {
    let decision = node.decision().unwrap_or(Decision::Max);
    let parent_visits = node.visits();

    let mut best: Option<(&Arc<Node<S, M>>, f64)> = None;
    for child in node.children() {
        let visits = child.visits();
        let value = child.utility() as f64 / visits.max(1) as f64;
        let score = selection_score(decision, parent_visits, visits.max(1), value, exploration);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((child, score));
        }
    }

    best.map(|(child, _)| Arc::clone(child))
}

/// Materializes the children of `node` and returns the node to simulate from.
///
/// Terminal nodes are closed and returned as is. An already expanded node
/// yields one of its existing children. When another worker holds the
/// expansion claim, the node itself is returned so the caller can still
/// evaluate something useful.
pub fn expand<G: GameOracle, R: Rng + ?Sized>(
    node: &Arc<Node<G::State, G::Move>>,
    oracle: &mut G,
    agent: &G::Role,
    rng: &mut R,
) -> Result<Arc<Node<G::State, G::Move>>, OracleError> {
    if !node.try_claim_expansion() {
        return Ok(pick_child(node, rng));
    }

    if oracle.is_terminal(node.state()) {
        node.close_as_terminal();
        return Ok(Arc::clone(node));
    }

    match enumerate_children(node.state(), oracle, agent, rng) {
        Ok((decision, children)) => {
            let children = node.publish_children(decision, children);
            trace!("Expanded node into {} children", children.len());
            Ok(pick_child(node, rng))
        }
        Err(e) => {
            node.release_expansion();
            Err(e)
        }
    }
}

fn pick_child<S, M, R: Rng + ?Sized>(node: &Arc<Node<S, M>>, rng: &mut R) -> Arc<Node<S, M>> {
    node.children().choose(rng).map_or_else(|| Arc::clone(node), Arc::clone)
}

type Children<G> = Vec<(<G as GameOracle>::Move, <G as GameOracle>::State)>;

fn enumerate_children<G: GameOracle, R: Rng + ?Sized>(
    state: &G::State,
    oracle: &mut G,
    agent: &G::Role,
    rng: &mut R,
) -> Result<(Decision, Children<G>), OracleError> {
    let mut actions = oracle.legal_moves(agent, state)?;
    actions.shuffle(rng);

    let decision = if actions.len() > 1 || oracle.roles().len() == 1 {
        Decision::Max
    } else {
        Decision::Min
    };

    let mut seen = HashSet::new();
    let mut children = Vec::new();
    for action in actions {
        for joint_move in oracle.joint_move_completions(state, agent, &action)? {
            let next = oracle.next_state(state, &joint_move)?;
            if seen.insert(next.clone()) {
                children.push((action.clone(), next));
            }
        }
    }

    Ok((decision, children))
}

/// Plays one random rollout from `state` and returns the agent's reward.
///
/// An ill-defined goal at the end of the rollout counts as a reward of 0.
pub fn simulate<G: GameOracle, R: Rng + ?Sized>(
    state: &G::State,
    oracle: &mut G,
    agent: &G::Role,
    rng: &mut R,
) -> Result<u32, OracleError> {
    let terminal = oracle.random_rollout(state, rng)?;

    match oracle.reward(agent, &terminal) {
        Ok(reward) => Ok(reward),
        Err(e @ OracleError::GoalDefinition { .. }) => {
            warn!("{e} in rollout, scoring it 0");
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

/// Runs select, expand, simulate and backpropagate once.
///
/// The deadline is checked after selection and after expansion so that no
/// rollout is started late. A rollout that was started is always recorded.
pub fn iterate<G: GameOracle, R: Rng + ?Sized>(
    root: &Arc<Node<G::State, G::Move>>,
    oracle: &mut G,
    policy: &Policy<G::Role>,
    deadline: &Deadline,
    rng: &mut R,
) -> Iteration {
    let frontier = select(root, policy.exploration, policy.epsilon, rng);
    if deadline.is_out_of_time() {
        return Iteration::Abandoned;
    }

    let leaf = match expand(&frontier, oracle, &policy.agent, rng) {
        Ok(leaf) => leaf,
        Err(e) => return Iteration::Failed(e),
    };
    if deadline.is_out_of_time() {
        return Iteration::Abandoned;
    }

    match simulate(leaf.state(), oracle, &policy.agent, rng) {
        Ok(reward) => {
            backpropagate(&leaf, u64::from(reward), 1);
            Iteration::Completed
        }
        Err(e) => Iteration::Failed(e),
    }
}
