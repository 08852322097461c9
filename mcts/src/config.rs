use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How simulation work is spread over workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One thread, one tree.
    Sequential,
    /// One tree, serial selection and expansion, parallel rollouts per wave.
    Leaf,
    /// One tree shared by every worker, each running full iterations.
    Tree,
    /// One tree per worker, root children merged after the search.
    Root,
    /// Decided at match start from a rollout throughput probe.
    Auto,
}

/// Search settings, fixed for a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Exploration constant `C`, on the scale of the game's rewards.
    pub exploration: f64,
    /// Probability of descending into a random child during selection.
    pub epsilon: f64,
    /// Minimum visits a root child needs to be picked as the best move.
    pub min_visits: u64,
    pub strategy: Strategy,
    /// Number of workers. Capped by the number of oracle instances.
    pub threads: usize,
    /// Seed for every random choice of the search. Entropy when absent.
    pub seed: Option<u64>,
    /// Cap on iterations started per search, across all workers.
    pub max_iterations: Option<u64>,
    /// Time kept in reserve before a turn's timeout.
    pub turn_margin_ms: u64,
    /// Time kept in reserve before the meta-game timeout.
    pub meta_game_margin_ms: u64,
    /// Added to the turn margin every time a turn overruns its timeout.
    pub margin_step_ms: u64,
    /// Length of the throughput probe run for [`Strategy::Auto`].
    pub probe_ms: u64,
    /// Rollouts per second above which [`Strategy::Auto`] stays sequential.
    pub probe_threshold: f64,
    /// Strategy [`Strategy::Auto`] falls back to for slow games.
    pub parallel_strategy: Strategy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration: 40.0,
            epsilon: 0.05,
            min_visits: 2,
            strategy: Strategy::Root,
            threads: 2,
            seed: None,
            max_iterations: None,
            turn_margin_ms: 4500,
            meta_game_margin_ms: 6000,
            margin_step_ms: 500,
            probe_ms: 5000,
            probe_threshold: 100.0,
            parallel_strategy: Strategy::Root,
        }
    }
}

impl SearchConfig {
    pub fn turn_margin(&self) -> Duration {
        Duration::from_millis(self.turn_margin_ms)
    }

    pub fn meta_game_margin(&self) -> Duration {
        Duration::from_millis(self.meta_game_margin_ms)
    }

    pub fn probe_duration(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SearchConfig = serde_json::from_str(r#"{ "exploration": 1.5, "strategy": "tree" }"#).unwrap();

        assert_eq!(config.strategy, Strategy::Tree);
        assert!((config.exploration - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.min_visits, 2);
        assert_eq!(config.turn_margin(), Duration::from_millis(4500));
    }
}
