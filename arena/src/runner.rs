use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use log::{debug, info};
use mcts::{GameOracle, Player, SearchConfig, SearchReport};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::Serialize;

use crate::tic_tac_toe::{Board, Mark, Move, TicTacToe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Opponent {
    /// Plays a uniformly random legal move.
    Random,
    /// A second searching player with the same settings.
    Mcts,
}

/// How a match is staged.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub games: usize,
    pub agent: Mark,
    pub opponent: Opponent,
    /// Oracle instances handed to each searching player.
    pub oracles: usize,
    pub start_clock: Duration,
    pub play_clock: Duration,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    pub game: usize,
    pub moves: Vec<u8>,
    pub agent_reward: u32,
    pub opponent_reward: u32,
    pub rollouts: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchSummary {
    pub games: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub records: Vec<GameRecord>,
}

impl MatchSummary {
    fn add(&mut self, record: GameRecord) {
        self.games += 1;
        match record.agent_reward.cmp(&record.opponent_reward) {
            std::cmp::Ordering::Greater => self.wins += 1,
            std::cmp::Ordering::Equal => self.draws += 1,
            std::cmp::Ordering::Less => self.losses += 1,
        }
        self.records.push(record);
    }
}

enum Seat {
    Searching(Box<Player<TicTacToe>>),
    Random(Pcg64),
}

impl Seat {
    fn new(kind: Opponent, role: Mark, settings: &MatchSettings, config: &SearchConfig, seed: u64) -> anyhow::Result<Self> {
        Ok(match kind {
            Opponent::Random => Seat::Random(Pcg64::seed_from_u64(seed)),
            Opponent::Mcts => {
                let config = SearchConfig {
                    seed: Some(config.seed.map_or(seed, |base| base ^ seed)),
                    ..config.clone()
                };
                let oracles = vec![TicTacToe; settings.oracles.max(1)];
                Seat::Searching(Box::new(Player::new(role, oracles, config)?))
            }
        })
    }

    fn start(&mut self, state: &Board, start_clock: Duration) -> anyhow::Result<SearchReport> {
        match self {
            Seat::Searching(player) => {
                let deadline = player.meta_game_deadline(Instant::now() + start_clock);
                Ok(player.meta_game(state, &deadline)?)
            }
            Seat::Random(_) => Ok(SearchReport::default()),
        }
    }

    fn play(&mut self, legal: &[Move], state: &Board, play_clock: Duration) -> anyhow::Result<Move> {
        match self {
            Seat::Searching(player) => {
                let deadline = player.turn_deadline(Instant::now() + play_clock);
                Ok(player.select_move(legal, state, &deadline)?)
            }
            Seat::Random(rng) => legal.choose(rng).copied().context("no legal move to pick"),
        }
    }
}

/// Plays `settings.games` games of tic-tac-toe between a searching agent and
/// the configured opponent, acting as the game manager.
pub fn play_match(settings: &MatchSettings, config: &SearchConfig) -> anyhow::Result<MatchSummary> {
    let mut summary = MatchSummary::default();

    for game in 1..=settings.games {
        let seed = settings.seed.wrapping_add(game as u64);
        let record = play_game(game, settings, config, seed)?;
        info!(
            "Game {game}: agent {} opponent {} after {} moves",
            record.agent_reward,
            record.opponent_reward,
            record.moves.len()
        );
        summary.add(record);
    }

    Ok(summary)
}

fn play_game(game: usize, settings: &MatchSettings, config: &SearchConfig, seed: u64) -> anyhow::Result<GameRecord> {
    let mut oracle = TicTacToe;
    let opponent_role = settings.agent.other();
    let mut agent = Seat::new(Opponent::Mcts, settings.agent, settings, config, seed)?;
    let mut opponent = Seat::new(settings.opponent, opponent_role, settings, config, seed ^ 0x5eed)?;

    let mut state = Board::default();
    let report = agent.start(&state, settings.start_clock)?;
    let _ = opponent.start(&state, settings.start_clock)?;
    let mut rollouts = report.rollouts;
    let mut moves = Vec::new();

    while !oracle.is_terminal(&state) {
        let mut joint_move = Vec::with_capacity(2);
        for role in oracle.roles() {
            let legal = oracle.legal_moves(&role, &state)?;
            let seat = if role == settings.agent { &mut agent } else { &mut opponent };
            let chosen = seat.play(&legal, &state, settings.play_clock)?;
            if !legal.contains(&chosen) {
                bail!("{role:?} submitted illegal move {chosen:?}");
            }
            joint_move.push(chosen);
        }

        debug!("Game {game} joint move {joint_move:?}");
        for mv in &joint_move {
            if let Move::Place(cell) = mv {
                moves.push(*cell);
            }
        }
        state = oracle.next_state(&state, &joint_move)?;
    }

    if let Seat::Searching(player) = &agent {
        rollouts += player.coordinator().map_or(0, |c| c.root_visits());
    }

    Ok(GameRecord {
        game,
        moves,
        agent_reward: oracle.reward(&settings.agent, &state)?,
        opponent_reward: oracle.reward(&opponent_role, &state)?,
        rollouts,
    })
}
