mod action;
mod config;
mod coordinator;
mod deadline;
mod graph;
mod oracle;
mod player;
mod probe;
mod search;
mod tree;

use thiserror::Error;

pub use action::{merge_root_children, select_action, summarize, ChildSummary};
pub use config::{SearchConfig, Strategy};
pub use coordinator::{build, Coordinator, LeafParallel, RootParallel, SearchReport, Sequential, TreeParallel};
pub use deadline::{Clock, Deadline, ManualClock, SystemClock};
pub use graph::{tree_graph, GraphEdge, GraphNode, TreeGraph};
pub use oracle::{random_rollout, GameOracle, OracleError};
pub use player::Player;
pub use probe::{probe_throughput, resolve_strategy, Throughput};
pub use search::{expand, iterate, select, selection_score, simulate, Iteration, Policy};
pub use tree::{backpropagate, Decision, Node, Tree};

/// Failures that stop a player from searching or answering.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no legal moves to choose from")]
    NoLegalMoves,
    #[error("at least one oracle instance is required")]
    NoOracles,
    #[error("failed to start the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
