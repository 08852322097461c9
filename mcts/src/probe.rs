//! Rollout throughput measurement, used once at match start to decide how
//! many workers are worth running.

use std::time::Duration;

use log::info;
use rand::Rng;

use crate::config::{SearchConfig, Strategy};
use crate::deadline::Deadline;
use crate::oracle::GameOracle;

/// Result of [`probe_throughput`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub rollouts: u64,
    pub elapsed: Duration,
}

impl Throughput {
    pub fn per_second(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.rollouts as f64 / seconds
        } else {
            0.0
        }
    }
}

/// Runs back to back rollouts from `state` until `deadline` is out of time.
pub fn probe_throughput<G: GameOracle, R: Rng + ?Sized>(
    oracle: &mut G,
    state: &G::State,
    deadline: &Deadline,
    rng: &mut R,
) -> Throughput {
    let started = deadline.clock().now();
    let mut rollouts = 0;

    while !deadline.is_out_of_time() {
        if oracle.random_rollout(state, rng).is_ok() {
            rollouts += 1;
        }
    }

    let throughput = Throughput {
        rollouts,
        elapsed: deadline.clock().now().saturating_duration_since(started),
    };
    info!("Rollouts per second: {:.1}", throughput.per_second());
    throughput
}

/// Picks a concrete strategy for [`Strategy::Auto`]. Games fast enough to
/// exceed the configured throughput gain nothing from extra workers.
pub fn resolve_strategy(config: &SearchConfig, throughput: Option<Throughput>) -> Strategy {
    if config.strategy != Strategy::Auto {
        return config.strategy;
    }

    let parallel = match config.parallel_strategy {
        Strategy::Auto => Strategy::Root,
        strategy => strategy,
    };

    match throughput {
        Some(throughput) if throughput.per_second() > config.probe_threshold => Strategy::Sequential,
        _ => parallel,
    }
}
