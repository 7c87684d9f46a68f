//! Reference walk driver on top of [`TransitionEngine`].
//!
//! The caller decides where walks start and how many there are; this module
//! only turns a list of start nodes into walks, feeding `(next, cur)` back
//! into the engine after every draw.

use crate::transition::{TransitionBuffer, TransitionEngine};
use crate::{Error, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkConfig {
    /// Maximum walk length (in nodes).
    pub length: usize,
    /// Seed for deterministic RNG.
    pub seed: u64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { length: 80, seed: 42 }
    }
}

/// Draw one neighbor from an aligned `(neighbors, probs)` pair by inverse CDF.
///
/// `probs` need not be normalized. Returns `None` only for an empty slice.
pub fn sample_cdf<R: Rng + ?Sized>(rng: &mut R, nbrs: &[usize], probs: &[f32]) -> Option<usize> {
    debug_assert_eq!(nbrs.len(), probs.len());
    if nbrs.len() == 1 {
        return Some(nbrs[0]);
    }

    let sum = probs.iter().copied().sum::<f32>();
    let mut r = rng.random::<f32>() * sum;
    for (i, &w) in probs.iter().enumerate() {
        if r < w {
            return Some(nbrs[i]);
        }
        r -= w;
    }
    // float rounding can leave r just past the last bucket
    nbrs.last().copied()
}

/// One walk from `start`.
///
/// `length` caps the number of nodes, so `length == 0` yields an empty walk.
/// Stops early at a node without neighbors. When the previous node is not a
/// neighbor of the current one (possible on directed graphs), that step
/// falls back to a first-order draw.
pub fn walk_from<R: Rng + ?Sized>(
    engine: &TransitionEngine<'_>,
    start: usize,
    length: usize,
    rng: &mut R,
    buf: &mut TransitionBuffer,
) -> Result<Vec<usize>> {
    let graph = engine.graph();
    if start >= graph.node_count() {
        return Err(Error::IndexOutOfBounds(start));
    }

    let mut walk = Vec::with_capacity(length);
    if length == 0 {
        return Ok(walk);
    }
    walk.push(start);

    let mut curr = start;
    let mut prev: Option<usize> = None;

    for _ in 1..length {
        if !graph.has_any_neighbor(curr) {
            break;
        }

        let second_order = prev.filter(|&p| graph.neighbor_exists(curr, p));
        engine.normalized_probs_into(curr, second_order, buf)?;
        let Some(next) = sample_cdf(rng, buf.neighbors(), buf.probs()) else {
            break;
        };

        walk.push(next);
        prev = Some(curr);
        curr = next;
    }

    Ok(walk)
}

/// One walk per entry of `start_nodes`, in order, from a single seeded RNG.
pub fn walks_from_nodes(
    engine: &TransitionEngine<'_>,
    start_nodes: &[usize],
    config: WalkConfig,
) -> Result<Vec<Vec<usize>>> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut buf = TransitionBuffer::with_capacity(engine.graph().node_count());

    let mut walks = Vec::with_capacity(start_nodes.len());
    for &node in start_nodes {
        walks.push(walk_from(engine, node, config.length, &mut rng, &mut buf)?);
    }
    log::debug!("generated {} walks (length <= {})", walks.len(), config.length);
    Ok(walks)
}

#[cfg(feature = "parallel")]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}

/// Parallel [`walks_from_nodes`]: every worker reads the same graph and owns
/// its own buffer.
///
/// Invariant: output is stable for a fixed `seed`, independent of Rayon
/// thread count. It differs from the serial variant because each walk gets
/// its own RNG stream.
#[cfg(feature = "parallel")]
pub fn walks_from_nodes_parallel(
    engine: &TransitionEngine<'_>,
    start_nodes: &[usize],
    config: WalkConfig,
) -> Result<Vec<Vec<usize>>> {
    use rayon::prelude::*;

    let n = engine.graph().node_count();
    start_nodes
        .par_iter()
        .enumerate()
        .map_init(
            || TransitionBuffer::with_capacity(n),
            |buf, (i, &node)| {
                let mut rng = ChaCha8Rng::seed_from_u64(mix64(config.seed ^ (i as u64)));
                walk_from(engine, node, config.length, &mut rng, buf)
            },
        )
        .collect()
}
