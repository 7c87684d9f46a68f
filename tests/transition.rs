use densewalk::{BiasPolicy, DenseGraph, Error, TransitionBuffer, TransitionConfig, TransitionEngine};
use proptest::prelude::*;

const POLICIES: [BiasPolicy; 2] = [BiasPolicy::Node2Vec, BiasPolicy::Node2VecPlus];

fn config(policy: BiasPolicy, p: f32, q: f32) -> TransitionConfig {
    TransitionConfig { p, q, policy, ..TransitionConfig::default() }
}

fn triangle() -> DenseGraph {
    DenseGraph::from_edges(3, &[(0, 1, 1.0), (0, 2, 1.0), (1, 2, 1.0)], false).unwrap()
}

fn assert_close_f32(a: f32, b: f32, eps: f32) {
    assert!(
        (a - b).abs() <= eps,
        "expected |{a} - {b}| <= {eps}, got {}",
        (a - b).abs()
    );
}

#[test]
fn triangle_is_unbiased_when_p_and_q_are_one() {
    let g = triangle();
    for policy in POLICIES {
        let engine = TransitionEngine::new(&g, config(policy, 1.0, 1.0)).unwrap();
        let mut buf = TransitionBuffer::new();
        engine.normalized_probs_into(1, Some(0), &mut buf).unwrap();

        let pairs: Vec<(usize, f32)> = buf.iter().collect();
        assert_eq!(pairs.len(), 2, "{policy:?}: self loop must not appear");
        assert_eq!(pairs[0].0, 0);
        assert_eq!(pairs[1].0, 2);
        assert_close_f32(pairs[0].1, 0.5, 1e-6);
        assert_close_f32(pairs[1].1, 0.5, 1e-6);
    }
}

#[test]
fn small_p_favours_returning() {
    let g = triangle();
    for policy in POLICIES {
        let engine = TransitionEngine::new(&g, config(policy, 0.5, 1.0)).unwrap();
        let probs = engine.normalized_probs(1, Some(0)).unwrap();
        // slot 0 is node 0 (the previous node)
        assert!(probs[0] > 0.5, "{policy:?}: return probability {} <= 0.5", probs[0]);
    }
}

#[test]
fn isolated_current_node_is_a_precondition_error() {
    let g = DenseGraph::from_edges(3, &[(0, 1, 1.0)], false).unwrap();
    for policy in POLICIES {
        let engine = TransitionEngine::new(&g, config(policy, 1.0, 1.0)).unwrap();
        assert_eq!(engine.normalized_probs(2, None), Err(Error::NoNeighbors(2)));
        assert_eq!(engine.normalized_probs(2, Some(0)), Err(Error::NoNeighbors(2)));
    }
}

#[test]
fn probabilities_align_with_neighbor_indices() {
    let g = DenseGraph::from_edges(5, &[(2, 0, 1.0), (2, 3, 2.0), (2, 4, 5.0)], false).unwrap();
    let engine = TransitionEngine::new(&g, TransitionConfig::default()).unwrap();
    let mut buf = TransitionBuffer::new();
    engine.normalized_probs_into(2, None, &mut buf).unwrap();

    let expected: Vec<usize> = g.neighbor_indices(2).collect();
    assert_eq!(buf.neighbors(), expected.as_slice());
    assert_close_f32(buf.probs()[2], 5.0 / 8.0, 1e-6);
}

#[test]
fn buffer_is_reusable_across_steps() {
    let g = DenseGraph::from_edges(
        4,
        &[(0, 1, 1.0), (1, 2, 2.0), (2, 3, 3.0), (3, 0, 4.0)],
        false,
    )
    .unwrap();
    let engine = TransitionEngine::new(&g, TransitionConfig::node2vec_plus(0.5, 2.0)).unwrap();
    let mut buf = TransitionBuffer::with_capacity(g.node_count());

    engine.normalized_probs_into(1, Some(0), &mut buf).unwrap();
    let first: Vec<(usize, f32)> = buf.iter().collect();

    // A failing call empties the buffer; the next call is unaffected.
    assert!(engine.normalized_probs_into(1, Some(3), &mut buf).is_err());
    assert!(buf.probs().is_empty());

    engine.normalized_probs_into(1, Some(0), &mut buf).unwrap();
    let again: Vec<(usize, f32)> = buf.iter().collect();
    assert_eq!(first, again);
}

#[test]
fn extreme_bias_on_zero_weight_edges_is_degenerate() {
    // Only neighbor of 1 other than 0 is 2; all of 1's edges carry weight 0.
    let mut w = vec![0.0f32; 9];
    w[1] = 1.0; // 0 -> 1
    let mask = vec![false, true, false, true, false, true, false, true, false];
    let g = DenseGraph::from_parts(3, w, mask).unwrap();
    let engine = TransitionEngine::new(&g, TransitionConfig::node2vec(1e-3, 1e3)).unwrap();
    assert_eq!(
        engine.normalized_probs(1, Some(0)),
        Err(Error::DegenerateDistribution { node: 1 })
    );
}

#[test]
fn masked_off_weights_are_never_read() {
    // Triangle 0-1-2 plus pendant 2-3. Every masked-off cell, diagonal
    // included, holds NaN or a huge value.
    let edges: [(usize, usize, f32); 4] = [(0, 1, 1.0), (0, 2, 1.0), (1, 2, 1.0), (2, 3, 2.0)];
    let clean = DenseGraph::from_edges(4, &edges, false).unwrap();

    let n = 4;
    let mut weights = vec![0.0f32; n * n];
    let mut mask = vec![false; n * n];
    for u in 0..n {
        for v in 0..n {
            let i = u * n + v;
            if clean.neighbor_exists(u, v) {
                weights[i] = clean.weights_row(u)[v];
                mask[i] = true;
            } else {
                weights[i] = if (u + v) % 2 == 0 { f32::NAN } else { 1e30 };
            }
        }
    }
    let dirty = DenseGraph::from_parts(n, weights, mask).unwrap();
    assert!(dirty.weights_row(1)[1].is_nan());
    assert!(dirty.weights_row(0)[0].is_nan());

    for policy in POLICIES {
        for (p, q) in [(1.0, 1.0), (0.5, 2.0), (4.0, 0.25)] {
            let clean_engine = TransitionEngine::new(&clean, config(policy, p, q)).unwrap();
            let dirty_engine = TransitionEngine::new(&dirty, config(policy, p, q)).unwrap();

            for cur in 0..n {
                let prevs = std::iter::once(None).chain(clean.neighbor_indices(cur).map(Some));
                for prev in prevs {
                    let want = clean_engine.normalized_probs(cur, prev).unwrap();
                    let got = dirty_engine.normalized_probs(cur, prev).unwrap();
                    assert_eq!(got, want, "{policy:?} p={p} q={q} cur={cur} prev={prev:?}");
                }
            }
        }
    }

    let engine = TransitionEngine::new(&dirty, config(BiasPolicy::Node2VecPlus, 1.0, 1.0)).unwrap();
    let probs = engine.normalized_probs(1, Some(0)).unwrap();
    assert_close_f32(probs[0], 0.5, 1e-6);
    assert_close_f32(probs[1], 0.5, 1e-6);
}

#[cfg(feature = "petgraph")]
#[test]
fn petgraph_adapter_densifies() {
    let mut pg = petgraph::Graph::<(), f32, petgraph::Undirected>::new_undirected();
    let a = pg.add_node(());
    let b = pg.add_node(());
    let c = pg.add_node(());
    pg.add_edge(a, b, 1.0);
    pg.add_edge(b, c, 3.0);

    let g = DenseGraph::from_weighted_graph(&pg).unwrap();
    assert!(g.neighbor_exists(1, 0));
    assert!(g.neighbor_exists(1, 2));
    assert!(!g.neighbor_exists(0, 2));
    assert_close_f32(g.average_neighbor_weight(1).unwrap(), 2.0, 1e-6);
}

/// Random undirected graph with strictly positive weights.
fn arb_graph() -> impl Strategy<Value = DenseGraph> {
    (2usize..8).prop_flat_map(|n| {
        prop::collection::vec((any::<bool>(), 0.1f32..5.0), n * n).prop_map(move |cells| {
            let mut edges = Vec::new();
            for u in 0..n {
                for v in (u + 1)..n {
                    let (present, w) = cells[u * n + v];
                    if present {
                        edges.push((u, v, w));
                    }
                }
            }
            DenseGraph::from_edges(n, &edges, false).unwrap()
        })
    })
}

fn non_common_mass(g: &DenseGraph, cur: usize, prev: usize, probs: &[f32]) -> f32 {
    g.neighbor_indices(cur)
        .zip(probs)
        .filter(|&(x, _)| x != prev && !g.neighbor_exists(prev, x))
        .map(|(_, &p)| p)
        .sum()
}

proptest! {
    // Property: every valid step yields a strictly positive distribution over
    // exactly cur's neighbors that sums to one.
    #[test]
    fn prop_probs_are_normalized_and_shaped(
        g in arb_graph(),
        p in 0.1f32..10.0,
        q in 0.1f32..10.0,
    ) {
        for policy in POLICIES {
            let engine = TransitionEngine::new(&g, config(policy, p, q)).unwrap();
            for cur in 0..g.node_count() {
                if !g.has_any_neighbor(cur) {
                    prop_assert_eq!(engine.normalized_probs(cur, None), Err(Error::NoNeighbors(cur)));
                    continue;
                }
                let prevs = std::iter::once(None).chain(g.neighbor_indices(cur).map(Some));
                for prev in prevs {
                    let probs = engine.normalized_probs(cur, prev).unwrap();
                    prop_assert_eq!(probs.len(), g.neighbor_count(cur));
                    prop_assert!(probs.iter().all(|&x| x > 0.0));
                    let sum: f32 = probs.iter().sum();
                    prop_assert!((sum - 1.0).abs() < 1e-4, "sum={}", sum);
                }
            }
        }
    }

    // Property: pure function, bit-identical on repeat.
    #[test]
    fn prop_repeat_calls_are_bit_identical(
        g in arb_graph(),
        p in 0.1f32..10.0,
        q in 0.1f32..10.0,
    ) {
        for policy in POLICIES {
            let engine = TransitionEngine::new(&g, config(policy, p, q)).unwrap();
            for cur in 0..g.node_count() {
                for prev in g.neighbor_indices(cur) {
                    let a = engine.normalized_probs(cur, Some(prev)).unwrap();
                    let b = engine.normalized_probs(cur, Some(prev)).unwrap();
                    let a_bits: Vec<u32> = a.iter().map(|x| x.to_bits()).collect();
                    let b_bits: Vec<u32> = b.iter().map(|x| x.to_bits()).collect();
                    prop_assert_eq!(a_bits, b_bits);
                }
            }
        }
    }

    // Property: a larger q never moves mass towards non-common neighbors.
    #[test]
    fn prop_classic_larger_q_never_favours_non_common(
        g in arb_graph(),
        p in 0.1f32..10.0,
        q in 0.1f32..10.0,
        scale in 1.5f32..4.0,
    ) {
        let base = TransitionEngine::new(&g, TransitionConfig::node2vec(p, q)).unwrap();
        let larger_q = TransitionEngine::new(&g, TransitionConfig::node2vec(p, q * scale)).unwrap();

        for cur in 0..g.node_count() {
            for prev in g.neighbor_indices(cur) {
                let b = base.normalized_probs(cur, Some(prev)).unwrap();
                let lq = larger_q.normalized_probs(cur, Some(prev)).unwrap();
                prop_assert!(
                    non_common_mass(&g, cur, prev, &lq) <= non_common_mass(&g, cur, prev, &b) + 1e-5
                );
            }
        }
    }

    // Property: under either policy a smaller p never lowers the return
    // probability.
    #[test]
    fn prop_smaller_p_never_lowers_return_probability(
        g in arb_graph(),
        p in 0.1f32..10.0,
        q in 0.1f32..10.0,
        scale in 1.5f32..4.0,
    ) {
        for policy in POLICIES {
            let base = TransitionEngine::new(&g, config(policy, p, q)).unwrap();
            let smaller_p = TransitionEngine::new(&g, config(policy, p / scale, q)).unwrap();

            for cur in 0..g.node_count() {
                for (slot, prev) in g.neighbor_indices(cur).enumerate() {
                    let b = base.normalized_probs(cur, Some(prev)).unwrap();
                    let sp = smaller_p.normalized_probs(cur, Some(prev)).unwrap();
                    prop_assert!(sp[slot] + 1e-5 >= b[slot], "{:?}: {} < {}", policy, sp[slot], b[slot]);
                }
            }
        }
    }
}
