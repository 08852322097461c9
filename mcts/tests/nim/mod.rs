use mcts::{GameOracle, OracleError};

/// Two players alternately take one or two stones; whoever takes the last
/// stone scores 100. The waiting player can only pass.
#[derive(Debug, Clone, Default)]
pub struct Nim;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NimState {
    pub pile: u8,
    pub mover: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NimMove {
    Take(u8),
    Noop,
}

impl NimState {
    pub fn new(pile: u8) -> Self {
        Self { pile, mover: 0 }
    }
}

fn joint(mover: usize, mv: NimMove) -> Vec<NimMove> {
    let mut joint = vec![NimMove::Noop, NimMove::Noop];
    joint[mover] = mv;
    joint
}

impl GameOracle for Nim {
    type State = NimState;
    type Role = usize;
    type Move = NimMove;

    fn roles(&self) -> Vec<Self::Role> {
        vec![0, 1]
    }

    fn is_terminal(&mut self, state: &Self::State) -> bool {
        state.pile == 0
    }

    fn legal_moves(&mut self, role: &Self::Role, state: &Self::State) -> Result<Vec<Self::Move>, OracleError> {
        if self.is_terminal(state) {
            return Err(OracleError::MoveDefinition { role: role.to_string() });
        }
        if *role == state.mover {
            Ok((1..=state.pile.min(2)).map(NimMove::Take).collect())
        } else {
            Ok(vec![NimMove::Noop])
        }
    }

    fn joint_move_completions(
        &mut self,
        state: &Self::State,
        role: &Self::Role,
        mv: &Self::Move,
    ) -> Result<Vec<Vec<Self::Move>>, OracleError> {
        if *role == state.mover {
            return Ok(vec![joint(state.mover, *mv)]);
        }
        let mover = state.mover;
        Ok(self
            .legal_moves(&mover, state)?
            .into_iter()
            .map(|mv| joint(mover, mv))
            .collect())
    }

    fn next_state(&mut self, state: &Self::State, joint_move: &[Self::Move]) -> Result<Self::State, OracleError> {
        match joint_move.get(state.mover) {
            Some(NimMove::Take(n)) if *n >= 1 && *n <= state.pile => Ok(NimState {
                pile: state.pile - n,
                mover: 1 - state.mover,
            }),
            _ => Err(OracleError::Transition(format!("{joint_move:?} at {state:?}"))),
        }
    }

    fn reward(&mut self, role: &Self::Role, state: &Self::State) -> Result<u32, OracleError> {
        if !self.is_terminal(state) {
            return Err(OracleError::GoalDefinition { role: role.to_string() });
        }
        // The player who just moved took the last stone.
        Ok(if *role != state.mover { 100 } else { 0 })
    }
}
