//! `densewalk`: node2vec / node2vec+ transition probabilities over dense graphs.
//!
//! A graph is held as an `N×N` weight matrix plus an `N×N` boolean adjacency
//! mask ([`DenseGraph`]). Given the walk state `(current, previous)` the
//! [`TransitionEngine`] produces a normalized distribution over `current`'s
//! neighbors, biased by the return parameter `p` and the in-out parameter `q`.
//!
//! Public invariants (must not drift):
//! - **Alignment**: probability slot `k` corresponds to the `k`-th mask-true
//!   column of `current`'s row ([`DenseGraph::neighbor_indices`]).
//! - **Purity**: identical inputs give bit-identical outputs.
//! - **No silent NaN**: isolated nodes, inconsistent walk states and
//!   zero-mass distributions are reported as [`Error`] variants.
//!
//! Swappable (allowed to change without breaking the contract):
//! - buffer reuse strategy
//! - iteration strategy of the walk driver (serial vs parallel)

pub mod dense;
pub mod graph;
pub mod transition;
pub mod walk;

pub use dense::DenseGraph;
pub use graph::{AdjacencyMatrix, Graph, WeightedGraph};
pub use transition::{BiasPolicy, TransitionBuffer, TransitionConfig, TransitionEngine};
pub use walk::{sample_cdf, walk_from, walks_from_nodes, WalkConfig};

#[cfg(feature = "parallel")]
pub use walk::walks_from_nodes_parallel;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(usize),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("shape mismatch: expected {expected} cells, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("node {0} has no neighbors")]
    NoNeighbors(usize),
    #[error("previous node {previous} is not a neighbor of current node {current}")]
    PreviousNotAdjacent { current: usize, previous: usize },
    #[error("biased weights around node {node} sum to zero")]
    DegenerateDistribution { node: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
