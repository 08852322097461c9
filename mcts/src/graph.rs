use std::sync::Arc;

use petgraph::graph::NodeIndex;
use petgraph::{Directed, Graph};

use crate::tree::Node;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GraphNode<S: Clone + Eq + PartialEq> {
    pub state: S,
    pub visits: u64,
    pub utility: u64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GraphEdge<A: Clone + Eq + PartialEq> {
    pub action: Option<A>,
}

pub type TreeGraph<S, A> = Graph<GraphNode<S>, GraphEdge<A>, Directed>;

fn add_state_to_graph<S: Clone + Eq + PartialEq, A: Clone + Eq + PartialEq>(
    graph: &mut TreeGraph<S, A>,
    node: &Node<S, A>,
) -> NodeIndex {
    graph.add_node(GraphNode {
        state: node.state().clone(),
        visits: node.visits(),
        utility: node.utility(),
    })
}

/// Snapshots the tree below `root` into a petgraph graph, one vertex per
/// search node and one edge per parent to child link labelled with the move.
///
/// The root is always the vertex at index 0.
pub fn tree_graph<S: Clone + Eq + PartialEq, A: Clone + Eq + PartialEq>(root: &Arc<Node<S, A>>) -> TreeGraph<S, A> {
    let mut graph = TreeGraph::<S, A>::new();
    let root_idx = add_state_to_graph(&mut graph, root);
    let mut pending: Vec<(NodeIndex, Arc<Node<S, A>>)> = vec![(root_idx, Arc::clone(root))];

    while let Some((node_idx, node)) = pending.pop() {
        for child in node.children() {
            let child_idx = add_state_to_graph(&mut graph, child);
            let _ = graph.add_edge(node_idx, child_idx, GraphEdge {
                action: child.action().cloned(),
            });
            pending.push((child_idx, Arc::clone(child)));
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use petgraph::algo::is_cyclic_directed;
    use petgraph::Direction;

    use super::*;
    use crate::tree::{backpropagate, Decision};

    #[test]
    fn snapshot_is_an_out_tree() {
        let root: Arc<Node<u32, char>> = Node::root(0);
        assert!(root.try_claim_expansion());
        let children = root.publish_children(Decision::Max, [('a', 1), ('b', 2)]);
        let first = Arc::clone(&children[0]);
        assert!(first.try_claim_expansion());
        let grandchild = Arc::clone(&first.publish_children(Decision::Min, [('c', 3), ('d', 4)])[1]);
        backpropagate(&grandchild, 60, 1);

        let graph = tree_graph(&root);

        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert!(!is_cyclic_directed(&graph));
        assert_eq!(graph.neighbors_directed(NodeIndex::new(0), Direction::Incoming).count(), 0);
        for idx in graph.node_indices().skip(1) {
            assert_eq!(graph.neighbors_directed(idx, Direction::Incoming).count(), 1);
        }

        let visited = graph.node_weights().find(|n| n.state == 4).unwrap();
        assert_eq!((visited.visits, visited.utility), (1, 60));
        assert_eq!(graph[NodeIndex::new(0)].visits, 1);
    }
}
