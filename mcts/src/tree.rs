//! The persistent search tree.
//!
//! Nodes are reference counted and own their children; the parent link is a
//! [`Weak`] handle used only to walk back up during backpropagation. Node
//! statistics are atomics so that several workers can update one tree, and
//! children are published exactly once through a [`OnceLock`] guarded by a
//! compare-and-swap flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use log::{debug, info};

/// Who picks the move at a node, from the point of view of the agent the
/// search plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The agent is choosing: optimistic, upper confidence bound.
    Max,
    /// Another role is choosing: pessimistic, lower confidence bound.
    Min,
}

#[derive(Debug)]
struct Expansion<S, M> {
    decision: Decision,
    terminal: bool,
    children: Vec<Arc<Node<S, M>>>,
}

/// A vertex of the search tree.
#[derive(Debug)]
pub struct Node<S, M> {
    state: S,
    parent: RwLock<Weak<Node<S, M>>>,
    action: Option<M>,
    visits: AtomicU64,
    utility: AtomicU64,
    expanding: AtomicBool,
    expansion: OnceLock<Expansion<S, M>>,
}

impl<S, M> Node<S, M> {
    pub fn root(state: S) -> Arc<Self> {
        Arc::new(Self::new(state, Weak::new(), None))
    }

    fn new(state: S, parent: Weak<Self>, action: Option<M>) -> Self {
        Self {
            state,
            parent: RwLock::new(parent),
            action,
            visits: AtomicU64::new(0),
            utility: AtomicU64::new(0),
            expanding: AtomicBool::new(false),
            expansion: OnceLock::new(),
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// The agent's move that led here from the parent.
    pub fn action(&self) -> Option<&M> {
        self.action.as_ref()
    }

    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.read().unwrap_or_else(PoisonError::into_inner).upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    pub fn visits(&self) -> u64 {
        self.visits.load(Ordering::Acquire)
    }

    pub fn utility(&self) -> u64 {
        self.utility.load(Ordering::Acquire)
    }

    /// Mean reward, `None` until the node has been visited.
    pub fn value(&self) -> Option<f64> {
        let visits = self.visits();
        if visits == 0 {
            None
        } else {
            Some(self.utility() as f64 / visits as f64)
        }
    }

    /// Children in creation order; empty until expanded.
    pub fn children(&self) -> &[Arc<Self>] {
        self.expansion.get().map_or(&[], |e| e.children.as_slice())
    }

    pub fn is_expanded(&self) -> bool {
        self.expansion.get().is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.expansion.get().is_some_and(|e| e.terminal)
    }

    /// Known once the node has been expanded.
    pub fn decision(&self) -> Option<Decision> {
        self.expansion.get().map(|e| e.decision)
    }

    /// Adds a batch of rollout results to this node only. Visits are counted
    /// before utility so readers never observe utility without visits.
    pub fn record(&self, reward_sum: u64, rollouts: u64) {
        self.visits.fetch_add(rollouts, Ordering::AcqRel);
        self.utility.fetch_add(reward_sum, Ordering::AcqRel);
    }

    /// Claims the right to expand this node. At most one caller wins, and no
    /// caller wins once the node has been expanded.
    pub(crate) fn try_claim_expansion(&self) -> bool {
        !self.is_expanded()
            && self
                .expanding
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Gives the claim back after a failed expansion so another iteration
    /// can retry.
    pub(crate) fn release_expansion(&self) {
        self.expanding.store(false, Ordering::Release);
    }

    pub(crate) fn close_as_terminal(&self) {
        let _ = self.expansion.set(Expansion {
            decision: Decision::Max,
            terminal: true,
            children: Vec::new(),
        });
    }

    fn detach(&self) {
        *self.parent.write().unwrap_or_else(PoisonError::into_inner) = Weak::new();
    }
}

impl<S, M> Node<S, M> {
    /// Publishes the children of a claimed node, built from
    /// `(action, state)` pairs in order.
    pub(crate) fn publish_children(
        self: &Arc<Self>,
        decision: Decision,
        children: impl IntoIterator<Item = (M, S)>,
    ) -> &[Arc<Self>] {
        let parent = Arc::downgrade(self);
        let children = children
            .into_iter()
            .map(|(action, state)| Arc::new(Self::new(state, parent.clone(), Some(action))))
            .collect();

        let _ = self.expansion.set(Expansion {
            decision,
            terminal: false,
            children,
        });

        self.children()
    }
}

/// A search tree and its current root.
#[derive(Debug)]
pub struct Tree<S, M> {
    root: Arc<Node<S, M>>,
}

impl<S: Eq, M> Tree<S, M> {
    pub fn new(state: S) -> Self {
        debug!("Creating new game tree root");
        Self { root: Node::root(state) }
    }

    pub fn root(&self) -> &Arc<Node<S, M>> {
        &self.root
    }

    /// Moves the root to the node holding `observed`.
    ///
    /// The current root is kept if it already holds the state. Otherwise a
    /// child with an equal state is promoted and everything else is dropped.
    /// When nothing matches a fresh root replaces the whole tree. Returns
    /// whether statistics were carried over.
    pub fn rebase(&mut self, observed: S) -> bool {
        if self.root.state == observed {
            return true;
        }

        let matched = self.root.children().iter().find(|child| child.state == observed).cloned();
        match matched {
            Some(child) => {
                child.detach();
                self.root = child;
                info!("Rebased tree, {} recycled visits", self.root.visits());
                true
            }
            None => {
                info!("New root not found in children, creating new game tree root");
                self.root = Node::root(observed);
                false
            }
        }
    }
}

/// Adds `reward_sum` over `rollouts` rollouts to `node` and every ancestor,
/// child first, without recursion.
pub fn backpropagate<S, M>(node: &Arc<Node<S, M>>, reward_sum: u64, rollouts: u64) {
    let mut current = Some(Arc::clone(node));

    while let Some(node) = current {
        node.record(reward_sum, rollouts);
        current = node.parent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded_root() -> Tree<u32, char> {
        let tree = Tree::new(0);
        assert!(tree.root().try_claim_expansion());
        let _ = tree.root().publish_children(Decision::Max, [('a', 1), ('b', 2)]);
        tree
    }

    #[test]
    fn unvisited_node_has_no_value() {
        let node: Arc<Node<u32, char>> = Node::root(7);

        assert_eq!(node.visits(), 0);
        assert_eq!(node.utility(), 0);
        assert_eq!(node.value(), None);
        assert!(node.is_root());
        assert!(node.children().is_empty());
    }

    #[test]
    fn backpropagate_walks_every_ancestor() {
        let tree = expanded_root();
        let child = Arc::clone(&tree.root().children()[1]);
        assert!(child.try_claim_expansion());
        let grandchild = Arc::clone(&child.publish_children(Decision::Min, [('c', 3)])[0]);

        backpropagate(&grandchild, 180, 3);
        backpropagate(&child, 40, 1);

        assert_eq!((grandchild.visits(), grandchild.utility()), (3, 180));
        assert_eq!((child.visits(), child.utility()), (4, 220));
        assert_eq!((tree.root().visits(), tree.root().utility()), (4, 220));
        assert_eq!(tree.root().children()[0].visits(), 0);
        assert_eq!(child.value(), Some(55.0));
    }

    #[test]
    fn expansion_is_claimed_once() {
        let node: Arc<Node<u32, char>> = Node::root(0);

        assert!(node.try_claim_expansion());
        assert!(!node.try_claim_expansion());

        node.release_expansion();
        assert!(node.try_claim_expansion());
        let _ = node.publish_children(Decision::Max, [('a', 1)]);

        node.release_expansion();
        assert!(!node.try_claim_expansion(), "an expanded node is never claimed again");
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn terminal_node_stays_closed() {
        let node: Arc<Node<u32, char>> = Node::root(0);
        assert!(node.try_claim_expansion());
        node.close_as_terminal();

        assert!(node.is_terminal());
        assert!(!node.try_claim_expansion());
        assert!(node.children().is_empty());
    }

    #[test]
    fn rebase_promotes_matching_child() {
        let mut tree = expanded_root();
        backpropagate(&tree.root().children()[1], 90, 2);

        assert!(tree.rebase(2));
        assert_eq!(*tree.root().state(), 2);
        assert!(tree.root().is_root());
        assert_eq!((tree.root().visits(), tree.root().utility()), (2, 90));
        assert_eq!(tree.root().action(), Some(&'b'));
    }

    #[test]
    fn rebase_keeps_root_holding_the_state() {
        let mut tree = expanded_root();

        assert!(tree.rebase(0));
        assert_eq!(tree.root().children().len(), 2);
    }

    #[test]
    fn rebase_without_match_starts_over() {
        let mut tree = expanded_root();
        backpropagate(&tree.root().children()[0], 10, 1);

        assert!(!tree.rebase(42));
        assert_eq!(*tree.root().state(), 42);
        assert_eq!(tree.root().visits(), 0);
        assert!(!tree.root().is_expanded());
    }
}
