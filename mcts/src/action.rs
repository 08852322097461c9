//! Picking the move to play from root statistics.

use std::collections::HashMap;
use std::hash::Hash;

use log::debug;

use crate::tree::{Decision, Node};

/// Statistics of one root child, detached from the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSummary<S, M> {
    pub state: S,
    pub action: Option<M>,
    pub visits: u64,
    pub utility: u64,
}

impl<S, M> ChildSummary<S, M> {
    pub fn value(&self) -> Option<f64> {
        if self.visits == 0 {
            None
        } else {
            Some(self.utility as f64 / self.visits as f64)
        }
    }
}

/// Snapshot of the children of `root`.
pub fn summarize<S: Clone, M: Clone>(root: &Node<S, M>) -> Vec<ChildSummary<S, M>> {
    root.children()
        .iter()
        .map(|child| ChildSummary {
            state: child.state().clone(),
            action: child.action().cloned(),
            visits: child.visits(),
            utility: child.utility(),
        })
        .collect()
}

/// Unions the root children of independently searched trees.
///
/// Children holding the same state are folded into one entry whose visits
/// and utility are the sums over all trees. Entries keep the order in which
/// their state was first seen.
pub fn merge_root_children<S, M, I>(roots: I) -> Vec<ChildSummary<S, M>>
where
    S: Clone + Eq + Hash,
    M: Clone,
    I: IntoIterator,
    I::Item: AsRef<Node<S, M>>,
{
    let mut merged: Vec<ChildSummary<S, M>> = Vec::new();
    let mut index: HashMap<S, usize> = HashMap::new();

    for root in roots {
        for child in summarize(root.as_ref()) {
            match index.get(&child.state) {
                Some(&position) => {
                    let entry = &mut merged[position];
                    entry.visits += child.visits;
                    entry.utility += child.utility;
                }
                None => {
                    let _ = index.insert(child.state.clone(), merged.len());
                    merged.push(child);
                }
            }
        }
    }

    merged
}

/// Chooses the move to submit.
///
/// At a [`Decision::Min`] root the agent has a single move, so the child with
/// the lowest value is reported. Otherwise the highest valued child with at
/// least `min_visits` visits wins. Whenever no child qualifies, or the winner
/// is not in `legal_moves`, the first legal move is played. Returns `None`
/// only when `legal_moves` is empty.
pub fn select_action<S, M: Clone + PartialEq>(
    decision: Option<Decision>,
    children: &[ChildSummary<S, M>],
    legal_moves: &[M],
    min_visits: u64,
) -> Option<M> {
    let fallback = legal_moves.first()?;

    let best = match decision {
        Some(Decision::Min) => pick(children, |value, best| value < best, 0),
        _ => pick(children, |value, best| value > best, min_visits),
    };

    let chosen = best
        .and_then(|child| child.action.as_ref())
        .filter(|action| legal_moves.contains(action));

    match chosen {
        Some(action) => {
            if let Some(value) = best.and_then(ChildSummary::value) {
                debug!("State/Action value: {value:.2}");
            }
            Some(action.clone())
        }
        None => {
            debug!("No qualifying child, playing the first legal move");
            Some(fallback.clone())
        }
    }
}

fn pick<S, M>(
    children: &[ChildSummary<S, M>],
    better: impl Fn(f64, f64) -> bool,
    min_visits: u64,
) -> Option<&ChildSummary<S, M>> {
    let mut best: Option<(&ChildSummary<S, M>, f64)> = None;

    for child in children.iter().filter(|child| child.visits >= min_visits) {
        let Some(value) = child.value() else { continue };
        if best.map_or(true, |(_, best_value)| better(value, best_value)) {
            best = Some((child, value));
        }
    }

    best.map(|(child, _)| child)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tree::backpropagate;

    fn summary(state: u32, action: char, visits: u64, utility: u64) -> ChildSummary<u32, char> {
        ChildSummary {
            state,
            action: Some(action),
            visits,
            utility,
        }
    }

    fn root_with(stats: &[(u32, char, u64, u64)]) -> Arc<Node<u32, char>> {
        let root = Node::root(0);
        assert!(root.try_claim_expansion());
        let children = root.publish_children(Decision::Max, stats.iter().map(|&(state, action, _, _)| (action, state)));
        for (child, &(_, _, visits, utility)) in children.iter().zip(stats) {
            backpropagate(child, utility, visits);
        }
        root
    }

    #[test]
    fn merge_sums_colliding_states() {
        let first = root_with(&[(1, 'a', 3, 150), (2, 'b', 1, 10)]);
        let second = root_with(&[(1, 'a', 2, 80)]);

        let merged = merge_root_children([first, second]);

        assert_eq!(merged, vec![summary(1, 'a', 5, 230), summary(2, 'b', 1, 10)]);
    }

    #[test]
    fn merge_keeps_states_missing_from_the_first_tree() {
        let first = root_with(&[(1, 'a', 1, 100)]);
        let second = root_with(&[(3, 'c', 4, 40), (1, 'a', 1, 0)]);

        let merged = merge_root_children(vec![first, second]);

        assert_eq!(merged, vec![summary(1, 'a', 2, 100), summary(3, 'c', 4, 40)]);
    }

    #[test]
    fn max_root_picks_highest_value_over_the_floor() {
        let children = [summary(1, 'a', 10, 500), summary(2, 'b', 1, 100), summary(3, 'c', 4, 280)];

        assert_eq!(select_action(Some(Decision::Max), &children, &['a', 'b', 'c'], 2), Some('c'));
    }

    #[test]
    fn floor_can_be_disabled_after_a_merge() {
        let first = root_with(&[(1, 'a', 3, 150), (2, 'b', 1, 100)]);
        let second = root_with(&[(1, 'a', 2, 80)]);
        let merged = merge_root_children([first, second]);

        assert_eq!(select_action(Some(Decision::Max), &merged, &['a', 'b'], 2), Some('a'));
        assert_eq!(select_action(Some(Decision::Max), &merged, &['a', 'b'], 0), Some('b'));
    }

    #[test]
    fn min_root_picks_lowest_value() {
        let children = [summary(1, 'a', 1, 70), summary(2, 'a', 5, 100)];

        assert_eq!(select_action(Some(Decision::Min), &children, &['a'], 2), Some('a'));
        assert_eq!(pick(&children, |value, best| value < best, 0), Some(&children[1]));
    }

    #[test]
    fn falls_back_to_first_legal_move() {
        let lonely = [summary(1, 'a', 1, 100)];

        assert_eq!(select_action::<u32, char>(Some(Decision::Max), &[], &['x', 'y'], 2), Some('x'));
        assert_eq!(select_action(None, &lonely, &['x', 'a'], 2), Some('x'));
        assert_eq!(select_action(Some(Decision::Max), &lonely, &['x'], 0), Some('x'), "illegal winners are never played");
        assert_eq!(select_action::<u32, char>(None, &[], &[], 2), None);
    }
}
