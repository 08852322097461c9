use rand::seq::SliceRandom;
use rand::Rng;

use crate::oracle::{GameOracle, OracleError};

/// Plays from `state` to a terminal state, picking one uniformly random legal
/// move for every role at each step.
pub fn random_rollout<R: Rng + ?Sized, G: GameOracle>(
    oracle: &mut G,
    state: &G::State,
    rng: &mut R,
) -> Result<G::State, OracleError> {
    let roles = oracle.roles();
    let mut state = state.clone();

    loop {
        if oracle.is_terminal(&state) {
            return Ok(state);
        }

        let mut joint_move = Vec::with_capacity(roles.len());
        for role in &roles {
            let moves = oracle.legal_moves(role, &state)?;
            let random_move = moves.choose(rng).ok_or_else(|| OracleError::MoveDefinition {
                role: format!("{role:?}"),
            })?;
            joint_move.push(random_move.clone());
        }

        state = oracle.next_state(&state, &joint_move)?;
    }
}
