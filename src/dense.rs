//! Dense adjacency representation.
//!
//! Weights and edge existence are stored as two parallel row-major `n*n`
//! buffers. The mask is the only source of truth for "is a neighbor": a
//! present edge may carry weight `0`, and weights at masked-false cells are
//! never read.

use crate::graph::WeightedGraph;
use crate::{Error, Result};

/// Immutable dense graph with eagerly computed per-node statistics.
///
/// Safe to share across walk workers: nothing here mutates after
/// construction.
#[derive(Debug, Clone)]
pub struct DenseGraph {
    n: usize,
    weights: Vec<f32>,
    mask: Vec<bool>,
    neighbor_counts: Vec<usize>,
    /// `NaN` for nodes without neighbors.
    average_weights: Vec<f32>,
}

impl DenseGraph {
    /// Build from row-major weight and mask buffers of length `n * n`.
    pub fn from_parts(n: usize, weights: Vec<f32>, mask: Vec<bool>) -> Result<Self> {
        let expected = cell_count(n)?;
        if weights.len() != expected {
            return Err(Error::ShapeMismatch { expected, actual: weights.len() });
        }
        if mask.len() != expected {
            return Err(Error::ShapeMismatch { expected, actual: mask.len() });
        }

        let mut neighbor_counts = Vec::with_capacity(n);
        let mut average_weights = Vec::with_capacity(n);
        for row in 0..n {
            let range = row * n..(row + 1) * n;
            let (count, sum) = weights[range.clone()]
                .iter()
                .zip(&mask[range])
                .filter(|(_, &m)| m)
                .fold((0usize, 0.0f32), |(c, s), (&w, _)| (c + 1, s + w));
            neighbor_counts.push(count);
            average_weights.push(if count == 0 { f32::NAN } else { sum / count as f32 });
        }

        let isolated = neighbor_counts.iter().filter(|&&c| c == 0).count();
        log::debug!("dense graph built: {n} nodes, {isolated} without neighbors");

        Ok(Self { n, weights, mask, neighbor_counts, average_weights })
    }

    /// Build from a square matrix; an edge exists wherever the weight is nonzero.
    pub fn from_matrix(rows: &[Vec<f32>]) -> Result<Self> {
        let n = rows.len();
        let mut weights = Vec::with_capacity(cell_count(n)?);
        for row in rows {
            if row.len() != n {
                return Err(Error::ShapeMismatch { expected: n, actual: row.len() });
            }
            weights.extend_from_slice(row);
        }
        let mask = weights.iter().map(|&w| w != 0.0).collect();
        Self::from_parts(n, weights, mask)
    }

    /// Build from `(source, target, weight)` triples.
    ///
    /// Undirected graphs get both directions. A repeated pair keeps the last
    /// weight seen.
    pub fn from_edges(n: usize, edges: &[(usize, usize, f32)], directed: bool) -> Result<Self> {
        let cells = cell_count(n)?;
        let mut weights = vec![0.0f32; cells];
        let mut mask = vec![false; cells];
        for &(u, v, w) in edges {
            for x in [u, v] {
                if x >= n {
                    return Err(Error::IndexOutOfBounds(x));
                }
            }
            weights[u * n + v] = w;
            mask[u * n + v] = true;
            if !directed {
                weights[v * n + u] = w;
                mask[v * n + u] = true;
            }
        }
        Self::from_parts(n, weights, mask)
    }

    /// Densify any weighted adapter (including `petgraph::Graph<_, f32>` with
    /// the `petgraph` feature).
    pub fn from_weighted_graph<G: WeightedGraph>(graph: &G) -> Result<Self> {
        let n = graph.node_count();
        let cells = cell_count(n)?;
        let mut weights = vec![0.0f32; cells];
        let mut mask = vec![false; cells];
        for u in 0..n {
            for v in graph.neighbors(u) {
                if v >= n {
                    return Err(Error::IndexOutOfBounds(v));
                }
                weights[u * n + v] = graph.edge_weight(u, v);
                mask[u * n + v] = true;
            }
        }
        Self::from_parts(n, weights, mask)
    }

    pub fn node_count(&self) -> usize {
        self.n
    }

    /// Full weight row of `node` (length `n`). Cells where the mask is false
    /// carry no meaning.
    ///
    /// Panics if `node >= n`.
    pub fn weights_row(&self, node: usize) -> &[f32] {
        &self.weights[node * self.n..(node + 1) * self.n]
    }

    /// Panics if `node >= n`.
    pub fn mask_row(&self, node: usize) -> &[bool] {
        &self.mask[node * self.n..(node + 1) * self.n]
    }

    /// `true` iff the edge `node -> candidate` exists.
    pub fn neighbor_exists(&self, node: usize, candidate: usize) -> bool {
        node < self.n && candidate < self.n && self.mask[node * self.n + candidate]
    }

    /// `true` iff `node` has at least one outgoing edge.
    ///
    /// Scans the mask row and stops at the first hit.
    pub fn has_any_neighbor(&self, node: usize) -> bool {
        node < self.n && self.mask_row(node).iter().any(|&m| m)
    }

    pub fn neighbor_count(&self, node: usize) -> usize {
        self.neighbor_counts.get(node).copied().unwrap_or(0)
    }

    /// Neighbor ids of `node` in column order.
    ///
    /// This is the slot order of every probability vector computed for `node`.
    pub fn neighbor_indices(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.mask_row(node).iter().enumerate().filter(|(_, &m)| m).map(|(j, _)| j)
    }

    /// Mean weight over `node`'s neighbors.
    pub fn average_neighbor_weight(&self, node: usize) -> Result<f32> {
        if node >= self.n {
            return Err(Error::IndexOutOfBounds(node));
        }
        if self.neighbor_counts[node] == 0 {
            return Err(Error::NoNeighbors(node));
        }
        Ok(self.average_weights[node])
    }

    /// Per-node average neighbor weight; `NaN` marks isolated nodes.
    pub fn average_weights(&self) -> &[f32] {
        &self.average_weights
    }

    /// Node2vec+ noise thresholds: `mean + gamma * std` of each node's
    /// neighbor weights, clamped at zero.
    ///
    /// `gamma == 0` returns the average-weight vector unchanged. Isolated
    /// nodes get `NaN`.
    pub fn noise_thresholds(&self, gamma: f32) -> Vec<f32> {
        if gamma == 0.0 {
            return self.average_weights.clone();
        }

        (0..self.n)
            .map(|v| {
                let count = self.neighbor_counts[v];
                if count == 0 {
                    return f32::NAN;
                }
                let mean = self.average_weights[v];
                let var = self
                    .weights_row(v)
                    .iter()
                    .zip(self.mask_row(v))
                    .filter(|(_, &m)| m)
                    .map(|(&w, _)| {
                        let d = w - mean;
                        d * d
                    })
                    .sum::<f32>()
                    / count as f32;
                (mean + gamma * var.sqrt()).max(0.0)
            })
            .collect()
    }
}

/// `n * n`, or an error if that does not fit in `usize`.
fn cell_count(n: usize) -> Result<usize> {
    n.checked_mul(n)
        .ok_or_else(|| Error::InvalidParameter(format!("node count {n} overflows n*n")))
}
