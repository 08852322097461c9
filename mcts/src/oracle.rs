pub mod random_rollout;

use std::fmt::Debug;
use std::hash::Hash;

use rand::Rng;
use thiserror::Error;

pub use random_rollout::random_rollout;

/// Failures reported by a [`GameOracle`] while evaluating the rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The role has no defined legal moves in a non-terminal state.
    #[error("no legal moves defined for {role} in a non-terminal state")]
    MoveDefinition { role: String },

    /// A joint move could not be applied to the state.
    #[error("illegal transition: {0}")]
    Transition(String),

    /// Zero or several goal values hold for the role at a terminal state.
    #[error("goal is ill-defined for {role}")]
    GoalDefinition { role: String },
}

/// Rule evaluation for one game, as seen by the search.
///
/// An instance keeps incremental evaluation state and is mutated by every
/// query, so it must never be shared between workers. Parallel searches are
/// handed one instance per worker.
pub trait GameOracle {
    type State: Clone + Eq + Hash + Debug + Send + Sync;
    type Role: Clone + Eq + Debug + Send + Sync;
    type Move: Clone + Eq + Debug + Send + Sync;

    /// Every role of the game, in joint-move order.
    fn roles(&self) -> Vec<Self::Role>;

    fn is_terminal(&mut self, state: &Self::State) -> bool;

    fn legal_moves(&mut self, role: &Self::Role, state: &Self::State) -> Result<Vec<Self::Move>, OracleError>;

    /// Joint moves (one move per role, in [`GameOracle::roles`] order) in
    /// which `role` plays `mv`, covering every simultaneous choice of the
    /// other roles.
    fn joint_move_completions(
        &mut self,
        state: &Self::State,
        role: &Self::Role,
        mv: &Self::Move,
    ) -> Result<Vec<Vec<Self::Move>>, OracleError>;

    fn next_state(&mut self, state: &Self::State, joint_move: &[Self::Move]) -> Result<Self::State, OracleError>;

    /// Goal value for `role` at a terminal state, nominally 0 to 100.
    fn reward(&mut self, role: &Self::Role, state: &Self::State) -> Result<u32, OracleError>;

    /// Plays uniformly random joint moves from `state` until a terminal state.
    fn random_rollout<R: Rng + ?Sized>(&mut self, state: &Self::State, rng: &mut R) -> Result<Self::State, OracleError>
    where
        Self: Sized,
    {
        random_rollout(self, state, rng)
    }
}
