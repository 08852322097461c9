use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mcts::{Clock, GameOracle, ManualClock, OracleError};
use rand::Rng;

pub const ROLE: &str = "solo";

/// One player picks a digit from 0 to 2 at each of `target.len()` steps and
/// scores 100 only when the whole sequence matches `target`.
#[derive(Debug, Clone)]
pub struct Solitaire {
    pub target: Vec<u8>,
    /// When set, every rollout moves this clock forward by `rollout_cost`.
    pub clock: Option<Arc<ManualClock>>,
    pub rollout_cost: Duration,
    /// Clock readings taken as each rollout starts.
    pub rollout_starts: Arc<Mutex<Vec<Instant>>>,
    /// This many transitions fail before the rules start behaving.
    pub failing_transitions: u32,
    pub broken_goals: bool,
}

impl Default for Solitaire {
    fn default() -> Self {
        Self {
            target: vec![2, 0, 1],
            clock: None,
            rollout_cost: Duration::ZERO,
            rollout_starts: Arc::new(Mutex::new(Vec::new())),
            failing_transitions: 0,
            broken_goals: false,
        }
    }
}

impl Solitaire {
    pub fn timed(clock: Arc<ManualClock>, rollout_cost: Duration) -> Self {
        Self {
            clock: Some(clock),
            rollout_cost,
            ..Self::default()
        }
    }

    pub fn initial_state(&self) -> Vec<u8> {
        Vec::new()
    }

    pub fn rollouts(&self) -> Vec<Instant> {
        self.rollout_starts.lock().unwrap().clone()
    }
}

impl GameOracle for Solitaire {
    type State = Vec<u8>;
    type Role = &'static str;
    type Move = u8;

    fn roles(&self) -> Vec<Self::Role> {
        vec![ROLE]
    }

    fn is_terminal(&mut self, state: &Self::State) -> bool {
        state.len() >= self.target.len()
    }

    fn legal_moves(&mut self, role: &Self::Role, state: &Self::State) -> Result<Vec<Self::Move>, OracleError> {
        if self.is_terminal(state) {
            return Err(OracleError::MoveDefinition { role: role.to_string() });
        }
        Ok(vec![0, 1, 2])
    }

    fn joint_move_completions(
        &mut self,
        _state: &Self::State,
        _role: &Self::Role,
        mv: &Self::Move,
    ) -> Result<Vec<Vec<Self::Move>>, OracleError> {
        Ok(vec![vec![*mv]])
    }

    fn next_state(&mut self, state: &Self::State, joint_move: &[Self::Move]) -> Result<Self::State, OracleError> {
        if self.failing_transitions > 0 {
            self.failing_transitions -= 1;
            return Err(OracleError::Transition("rules engine hiccup".to_string()));
        }
        match joint_move {
            [digit] if *digit < 3 => {
                let mut next = state.clone();
                next.push(*digit);
                Ok(next)
            }
            _ => Err(OracleError::Transition(format!("{joint_move:?}"))),
        }
    }

    fn reward(&mut self, role: &Self::Role, state: &Self::State) -> Result<u32, OracleError> {
        if self.broken_goals {
            return Err(OracleError::GoalDefinition { role: role.to_string() });
        }
        Ok(if *state == self.target { 100 } else { 0 })
    }

    fn random_rollout<R: Rng + ?Sized>(&mut self, state: &Self::State, rng: &mut R) -> Result<Self::State, OracleError> {
        if let Some(clock) = &self.clock {
            self.rollout_starts.lock().unwrap().push(clock.now());
            clock.advance(self.rollout_cost);
        }
        mcts::random_rollout(self, state, rng)
    }
}
