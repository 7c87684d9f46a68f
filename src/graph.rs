//! Minimal graph adapter traits.
//!
//! These let callers hand any adjacency structure to
//! [`DenseGraph::from_weighted_graph`](crate::DenseGraph::from_weighted_graph)
//! without going through an intermediate edge list.

pub trait Graph {
    fn node_count(&self) -> usize;
    fn neighbors(&self, node: usize) -> Vec<usize>;
}

pub trait WeightedGraph: Graph {
    /// Weight of `source -> target`. Only queried for pairs reported by
    /// [`Graph::neighbors`].
    fn edge_weight(&self, source: usize, target: usize) -> f32;
}

/// Borrowed dense matrix view: an edge exists wherever the weight is nonzero.
pub struct AdjacencyMatrix<'a>(pub &'a [Vec<f32>]);

impl<'a> Graph for AdjacencyMatrix<'a> {
    fn node_count(&self) -> usize {
        self.0.len()
    }
    fn neighbors(&self, node: usize) -> Vec<usize> {
        self.0[node].iter().enumerate().filter(|(_, &w)| w != 0.0).map(|(i, _)| i).collect()
    }
}

impl<'a> WeightedGraph for AdjacencyMatrix<'a> {
    fn edge_weight(&self, source: usize, target: usize) -> f32 {
        self.0[source][target]
    }
}

#[cfg(feature = "petgraph")]
impl<N, E, Ty, Ix> Graph for petgraph::Graph<N, E, Ty, Ix>
where
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    fn node_count(&self) -> usize {
        self.node_count()
    }
    fn neighbors(&self, node: usize) -> Vec<usize> {
        self.neighbors(petgraph::graph::NodeIndex::new(node)).map(|idx| idx.index()).collect()
    }
}

#[cfg(feature = "petgraph")]
impl<N, Ty, Ix> WeightedGraph for petgraph::Graph<N, f32, Ty, Ix>
where
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    fn edge_weight(&self, source: usize, target: usize) -> f32 {
        use petgraph::graph::NodeIndex;
        self.find_edge(NodeIndex::new(source), NodeIndex::new(target))
            .map(|e| self[e])
            .unwrap_or(0.0)
    }
}
