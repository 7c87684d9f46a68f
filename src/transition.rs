//! Node2Vec / Node2Vec+ transition probabilities over a [`DenseGraph`].
//!
//! Semantics follow PecanPy's dense random-walk graph
//! (`get_normalized_probs`, `get_extended_normalized_probs`):
//! - classic: neighbors of `cur` that are not neighbors of `prev` are out
//!   edges and get divided by `q`
//! - plus: out-ness is continuous, `alpha = 1/q + (1 - 1/q) * t` with
//!   `t = w(prev, x) / thr[prev]`, and noisy edges (`w(cur, x) < thr[cur]`)
//!   are capped at `min(1, 1/q)`
//!
//! In both cases the weight back to `prev` is divided by `p`, and the biased
//! row is restricted to `cur`'s mask and normalized by one shared routine.

use std::borrow::Cow;

use crate::dense::DenseGraph;
use crate::{Error, Result};

/// Which bias scheme a session uses. Chosen once, never per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BiasPolicy {
    /// Hard common / non-common split (Grover & Leskovec 2016).
    #[default]
    Node2Vec,
    /// Continuous out-edge classification driven by average edge weight.
    Node2VecPlus,
}

/// Parameters for a transition session.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionConfig {
    /// Return parameter \(p\).
    pub p: f32,
    /// In-out parameter \(q\).
    pub q: f32,
    /// Node2vec+ noise threshold is `mean + gamma * std` of a node's edge
    /// weights. `0.0` means the plain average.
    pub gamma: f32,
    pub policy: BiasPolicy,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self { p: 1.0, q: 1.0, gamma: 0.0, policy: BiasPolicy::Node2Vec }
    }
}

impl TransitionConfig {
    pub fn node2vec(p: f32, q: f32) -> Self {
        Self { p, q, ..Self::default() }
    }

    pub fn node2vec_plus(p: f32, q: f32) -> Self {
        Self { p, q, policy: BiasPolicy::Node2VecPlus, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.p.is_finite() && self.p > 0.0) {
            return Err(Error::InvalidParameter(format!("p must be finite and > 0, got {}", self.p)));
        }
        if !(self.q.is_finite() && self.q > 0.0) {
            return Err(Error::InvalidParameter(format!("q must be finite and > 0, got {}", self.q)));
        }
        if !self.gamma.is_finite() {
            return Err(Error::InvalidParameter(format!("gamma must be finite, got {}", self.gamma)));
        }
        Ok(())
    }
}

/// Per-worker scratch space.
///
/// After a call to [`TransitionEngine::normalized_probs_into`],
/// `neighbors()[k]` is the node id for probability `probs()[k]`. Once the
/// buffers have grown to the node count, further steps do not allocate.
#[derive(Debug, Clone, Default)]
pub struct TransitionBuffer {
    raw: Vec<f32>,
    neighbors: Vec<usize>,
    probs: Vec<f32>,
}

impl TransitionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for a graph with `n` nodes.
    pub fn with_capacity(n: usize) -> Self {
        Self { raw: Vec::with_capacity(n), neighbors: Vec::with_capacity(n), probs: Vec::with_capacity(n) }
    }

    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    /// `(neighbor, probability)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.neighbors.iter().copied().zip(self.probs.iter().copied())
    }

    fn clear(&mut self) {
        self.raw.clear();
        self.neighbors.clear();
        self.probs.clear();
    }
}

/// Transition-probability engine bound to one immutable graph.
///
/// `Sync`: a single engine can serve any number of workers, each with its
/// own [`TransitionBuffer`].
#[derive(Debug, Clone)]
pub struct TransitionEngine<'g> {
    graph: &'g DenseGraph,
    config: TransitionConfig,
    thresholds: Cow<'g, [f32]>,
}

impl<'g> TransitionEngine<'g> {
    pub fn new(graph: &'g DenseGraph, config: TransitionConfig) -> Result<Self> {
        config.validate()?;

        let thresholds = match config.policy {
            BiasPolicy::Node2VecPlus if config.gamma != 0.0 => {
                Cow::Owned(graph.noise_thresholds(config.gamma))
            }
            _ => Cow::Borrowed(graph.average_weights()),
        };

        log::debug!(
            "transition engine: policy={:?} p={} q={} gamma={} nodes={}",
            config.policy,
            config.p,
            config.q,
            config.gamma,
            graph.node_count()
        );

        Ok(Self { graph, config, thresholds })
    }

    pub fn graph(&self) -> &'g DenseGraph {
        self.graph
    }

    pub fn config(&self) -> TransitionConfig {
        self.config
    }

    /// Compute the distribution over `cur`'s neighbors into `buf`.
    ///
    /// `prev == None` is a first-order step: plain weighted choice.
    ///
    /// Errors:
    /// - [`Error::IndexOutOfBounds`] if `cur` or `prev` is not a node
    /// - [`Error::NoNeighbors`] if `cur` is isolated
    /// - [`Error::PreviousNotAdjacent`] if `prev` is not a neighbor of `cur`
    /// - [`Error::DegenerateDistribution`] if the biased weights sum to zero
    ///
    /// On error `buf` is left empty.
    pub fn normalized_probs_into(
        &self,
        cur: usize,
        prev: Option<usize>,
        buf: &mut TransitionBuffer,
    ) -> Result<()> {
        buf.clear();

        let graph = self.graph;
        let n = graph.node_count();
        if cur >= n {
            return Err(Error::IndexOutOfBounds(cur));
        }
        if graph.neighbor_count(cur) == 0 {
            return Err(Error::NoNeighbors(cur));
        }

        buf.raw.extend_from_slice(graph.weights_row(cur));

        if let Some(prev) = prev {
            if prev >= n {
                buf.clear();
                return Err(Error::IndexOutOfBounds(prev));
            }
            if !graph.neighbor_exists(cur, prev) {
                buf.clear();
                return Err(Error::PreviousNotAdjacent { current: cur, previous: prev });
            }
            match self.config.policy {
                BiasPolicy::Node2Vec => {
                    apply_node2vec_bias(graph, cur, prev, self.config, &mut buf.raw)
                }
                BiasPolicy::Node2VecPlus => apply_node2vec_plus_bias(
                    graph,
                    cur,
                    prev,
                    self.config,
                    &self.thresholds,
                    &mut buf.raw,
                ),
            }
        }

        let TransitionBuffer { raw, neighbors, probs } = &mut *buf;
        let res = normalize_masked(cur, graph.mask_row(cur), raw, neighbors, probs);
        if res.is_err() {
            buf.clear();
        }
        res
    }

    /// Allocating variant of [`normalized_probs_into`](Self::normalized_probs_into).
    ///
    /// Slot `k` belongs to the `k`-th item of
    /// [`DenseGraph::neighbor_indices`] for `cur`.
    pub fn normalized_probs(&self, cur: usize, prev: Option<usize>) -> Result<Vec<f32>> {
        let mut buf = TransitionBuffer::with_capacity(self.graph.node_count());
        self.normalized_probs_into(cur, prev, &mut buf)?;
        Ok(buf.probs)
    }
}

fn apply_node2vec_bias(
    graph: &DenseGraph,
    cur: usize,
    prev: usize,
    config: TransitionConfig,
    raw: &mut [f32],
) {
    let cur_nbrs = graph.mask_row(cur);
    let prev_nbrs = graph.mask_row(prev);

    for (k, (&is_nbr, &is_prev_nbr)) in cur_nbrs.iter().zip(prev_nbrs).enumerate() {
        // prev itself only ever gets the return bias
        if is_nbr && !is_prev_nbr && k != prev {
            raw[k] /= config.q;
        }
    }

    raw[prev] /= config.p;
}

fn apply_node2vec_plus_bias(
    graph: &DenseGraph,
    cur: usize,
    prev: usize,
    config: TransitionConfig,
    thresholds: &[f32],
    raw: &mut [f32],
) {
    let cur_nbrs = graph.mask_row(cur);
    let prev_nbrs = graph.mask_row(prev);
    let prev_wts = graph.weights_row(prev);

    let inv_q = 1.0 / config.q;
    let thr_prev = thresholds[prev];
    let thr_cur = thresholds[cur];

    for k in 0..raw.len() {
        if !cur_nbrs[k] || k == prev {
            continue;
        }

        // Non-neighbors of prev count as weight 0 (t = 0, full out bias).
        let w_prev = if prev_nbrs[k] { prev_wts[k] } else { 0.0 };
        // Also false when thr_prev is NaN (prev isolated).
        if !(w_prev < thr_prev) {
            continue;
        }

        let t = w_prev / thr_prev;
        let mut alpha = inv_q + (1.0 - inv_q) * t;
        if raw[k] < thr_cur {
            alpha = inv_q.min(1.0);
        }
        raw[k] *= alpha;
    }

    raw[prev] /= config.p;
}

/// Shared tail: keep mask-true slots in row order and divide by their sum.
fn normalize_masked(
    node: usize,
    mask_row: &[bool],
    raw: &[f32],
    neighbors: &mut Vec<usize>,
    probs: &mut Vec<f32>,
) -> Result<()> {
    debug_assert_eq!(mask_row.len(), raw.len());
    for (k, (&m, &w)) in mask_row.iter().zip(raw).enumerate() {
        if m {
            neighbors.push(k);
            probs.push(w);
        }
    }

    let sum = probs.iter().copied().sum::<f32>();
    if !(sum > 0.0 && sum.is_finite()) {
        log::trace!("degenerate distribution at node {node}: sum={sum}");
        return Err(Error::DegenerateDistribution { node });
    }

    for v in probs.iter_mut() {
        *v /= sum;
    }
    Ok(())
}
