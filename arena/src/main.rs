use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;
use mcts::{SearchConfig, Strategy};

use crate::runner::{play_match, MatchSettings, Opponent};
use crate::tic_tac_toe::Mark;

mod runner;
mod tic_tac_toe;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyCli {
    Sequential,
    Leaf,
    Tree,
    Root,
    Auto,
}

impl From<StrategyCli> for Strategy {
    fn from(cli: StrategyCli) -> Self {
        match cli {
            StrategyCli::Sequential => Strategy::Sequential,
            StrategyCli::Leaf => Strategy::Leaf,
            StrategyCli::Tree => Strategy::Tree,
            StrategyCli::Root => Strategy::Root,
            StrategyCli::Auto => Strategy::Auto,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "arena", version, about = "Plays tic-tac-toe matches against an MCTS player")]
struct Config {
    /// Number of games to play
    #[arg(short = 'g', long, default_value_t = 1)]
    games: usize,

    /// Role played by the searching agent
    #[arg(long, value_enum, default_value = "x")]
    role: Mark,

    /// Who the agent plays against
    #[arg(long, value_enum, default_value = "random")]
    opponent: Opponent,

    /// JSON file with search settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Search strategy
    #[arg(short = 's', long, value_enum)]
    strategy: Option<StrategyCli>,

    /// Worker threads, and oracle instances per player
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Start clock in milliseconds
    #[arg(long, default_value_t = 10_000)]
    start_ms: u64,

    /// Play clock in milliseconds
    #[arg(long, default_value_t = 6_000)]
    play_ms: u64,

    /// Time kept in reserve before each play clock runs out
    #[arg(long)]
    turn_margin_ms: Option<u64>,

    /// Time kept in reserve before the start clock runs out
    #[arg(long)]
    meta_game_margin_ms: Option<u64>,

    /// Cap on iterations per search
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Base seed for every game of the match
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl Config {
    fn search_config(&self) -> anyhow::Result<SearchConfig> {
        let mut search = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
            }
            None => SearchConfig::default(),
        };

        if let Some(strategy) = self.strategy {
            search.strategy = strategy.into();
        }
        if let Some(threads) = self.threads {
            search.threads = threads;
        }
        if let Some(margin) = self.turn_margin_ms {
            search.turn_margin_ms = margin;
        }
        if let Some(margin) = self.meta_game_margin_ms {
            search.meta_game_margin_ms = margin;
        }
        if self.max_iterations.is_some() {
            search.max_iterations = self.max_iterations;
        }

        Ok(search)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).
    let config = Config::parse();
    let search = config.search_config()?;
    info!("Search settings: {search:?}");

    let settings = MatchSettings {
        games: config.games,
        agent: config.role,
        opponent: config.opponent,
        oracles: search.threads.max(1),
        start_clock: Duration::from_millis(config.start_ms),
        play_clock: Duration::from_millis(config.play_ms),
        seed: config.seed,
    };

    let summary = play_match(&settings, &search)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
