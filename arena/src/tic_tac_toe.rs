use mcts::{GameOracle, OracleError};
use serde::{Deserialize, Serialize};

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    X,
    O,
}

impl Mark {
    fn index(self) -> usize {
        match self {
            Mark::X => 0,
            Mark::O => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Place(u8),
    Noop,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [Option<Mark>; 9],
    mover: Mark,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            cells: [None; 9],
            mover: Mark::X,
        }
    }
}

impl Board {
    /// Builds a position from a 9 character row-major picture using `x`, `o`
    /// and `.`.
    #[cfg(test)]
    pub fn parse(picture: &str, mover: Mark) -> Option<Self> {
        let mut cells = [None; 9];
        let mut count = 0;
        for (cell, c) in cells.iter_mut().zip(picture.chars().filter(|c| !c.is_whitespace())) {
            *cell = match c {
                'x' => Some(Mark::X),
                'o' => Some(Mark::O),
                '.' => None,
                _ => return None,
            };
            count += 1;
        }
        (count == 9).then_some(Self { cells, mover })
    }

    pub fn winner(&self) -> Option<Mark> {
        LINES.iter().find_map(|&[a, b, c]| match (self.cells[a], self.cells[b], self.cells[c]) {
            (Some(x), Some(y), Some(z)) if x == y && y == z => Some(x),
            _ => None,
        })
    }

    fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    fn empty_cells(&self) -> impl Iterator<Item = u8> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(i, _)| i as u8)
    }
}

fn joint(mover: Mark, mv: Move) -> Vec<Move> {
    let mut joint = vec![Move::Noop, Move::Noop];
    joint[mover.index()] = mv;
    joint
}

/// Tic-tac-toe with simultaneous-move framing: both roles submit a move every
/// turn and the role not in control plays [`Move::Noop`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToe;

impl GameOracle for TicTacToe {
    type State = Board;
    type Role = Mark;
    type Move = Move;

    fn roles(&self) -> Vec<Mark> {
        vec![Mark::X, Mark::O]
    }

    fn is_terminal(&mut self, state: &Board) -> bool {
        state.winner().is_some() || state.is_full()
    }

    fn legal_moves(&mut self, role: &Mark, state: &Board) -> Result<Vec<Move>, OracleError> {
        if self.is_terminal(state) {
            return Err(OracleError::MoveDefinition { role: format!("{role:?}") });
        }
        if *role == state.mover {
            Ok(state.empty_cells().map(Move::Place).collect())
        } else {
            Ok(vec![Move::Noop])
        }
    }

    fn joint_move_completions(&mut self, state: &Board, role: &Mark, mv: &Move) -> Result<Vec<Vec<Move>>, OracleError> {
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

    fn next_state(&mut self, state: &Board, joint_move: &[Move]) -> Result<Board, OracleError> {
        match joint_move.get(state.mover.index()) {
            Some(&Move::Place(cell)) if state.cells.get(usize::from(cell)) == Some(&None) => {
                let mut next = state.clone();
                next.cells[usize::from(cell)] = Some(state.mover);
                next.mover = state.mover.other();
                Ok(next)
            }
            _ => Err(OracleError::Transition(format!("{joint_move:?} with {:?} to move", state.mover))),
        }
    }

    fn reward(&mut self, role: &Mark, state: &Board) -> Result<u32, OracleError> {
        match state.winner() {
            Some(winner) if winner == *role => Ok(100),
            Some(_) => Ok(0),
            None if state.is_full() => Ok(50),
            None => Err(OracleError::GoalDefinition { role: format!("{role:?}") }),
        }
    }
}
