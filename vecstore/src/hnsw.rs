use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use rand::Rng;

use crate::dot::inner_product;
use crate::error::VecError;
use crate::vecstore::{Match, VecIndex};

/// Cap on the randomly drawn node level.
const MAX_LEVEL: usize = 31;

/// Similarity at or above which two stored vectors count as copies.
const DUPLICATE_SIM: f32 = 1.0 - 1e-5;

/// HNSWConfig configures a new HNSW index.
#[derive(Debug, Clone, Default)]
pub struct HNSWConfig {
    /// Vector dimension. Required; must be positive.
    pub dim: usize,
    /// Max connections per node per layer (except layer 0 which allows 2*M).
    /// Default: 16.
    pub m: usize,
    /// Size of the dynamic candidate list during index building.
    /// Default: 200.
    pub ef_construction: usize,
    /// Default size of the dynamic candidate list during search.
    /// Default: 50.
    pub ef_search: usize,
}

impl HNSWConfig {
    pub(crate) fn set_defaults(&mut self) {
        if self.m < 2 {
            self.m = 16;
        }
        if self.ef_construction == 0 {
            self.ef_construction = 200;
        }
        if self.ef_search == 0 {
            self.ef_search = 50;
        }
    }

    fn max_conns(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m * 2
        } else {
            self.m
        }
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// A graph slot with its similarity to the current query. Orders by
/// similarity, so a plain `BinaryHeap` pops the most similar first and a
/// `BinaryHeap<Reverse<_>>` pops the least similar first.
#[derive(Clone, Copy, Debug)]
struct Scored {
    pos: u32,
    sim: f32,
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sim.total_cmp(&other.sim)
    }
}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

// ---------------------------------------------------------------------------
// HNSW
// ---------------------------------------------------------------------------

struct Node {
    vector: Vec<f32>,
    /// `links[layer]` lists neighbor positions on that layer.
    links: Vec<Vec<u32>>,
}

/// HNSW is a Hierarchical Navigable Small World graph implementing
/// [VecIndex] with inner product as the similarity.
///
/// Nodes are never removed, so a node's slot in the graph is also its
/// insertion position. Results are approximate; a vector identical to the
/// query is still found with score ~1.0 in practice.
pub struct HNSW {
    cfg: HNSWConfig,
    nodes: Vec<Node>,
    entry: Option<u32>,
    top_layer: usize,
    level_mul: f64,
}

impl HNSW {
    /// Create an empty HNSW index with the given configuration.
    pub fn new(mut cfg: HNSWConfig) -> Result<Self, VecError> {
        if cfg.dim == 0 {
            return Err(VecError::InvalidConfig(
                "HNSWConfig.dim must be positive".into(),
            ));
        }
        cfg.set_defaults();
        let level_mul = 1.0 / (cfg.m as f64).ln();
        Ok(Self {
            cfg,
            nodes: Vec::new(),
            entry: None,
            top_layer: 0,
            level_mul,
        })
    }

    fn sim(&self, query: &[f32], pos: u32) -> f32 {
        inner_product(query, &self.nodes[pos as usize].vector)
    }

    fn scored(&self, query: &[f32], pos: u32) -> Scored {
        Scored {
            pos,
            sim: self.sim(query, pos),
        }
    }

    fn neighbors(&self, pos: u32, layer: usize) -> &[u32] {
        self.nodes[pos as usize]
            .links
            .get(layer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn random_level(&self) -> usize {
        let r: f64 = rand::thread_rng().r#gen::<f64>().max(f64::MIN_POSITIVE);
        ((-r.ln() * self.level_mul) as usize).min(MAX_LEVEL)
    }

    /// Hill-climb towards `query` on each of `layers` in turn, keeping the
    /// best node found as the start of the next layer.
    fn greedy(&self, query: &[f32], start: u32, layers: impl Iterator<Item = usize>) -> Scored {
        let mut best = self.scored(query, start);
        for layer in layers {
            loop {
                let next = self
                    .neighbors(best.pos, layer)
                    .iter()
                    .map(|&n| self.scored(query, n))
                    .max()
                    .filter(|cand| cand.sim > best.sim);
                match next {
                    Some(cand) => best = cand,
                    None => break,
                }
            }
        }
        best
    }

    /// Beam search on one layer. Returns at most `ef` nodes, unordered.
    fn beam(&self, query: &[f32], seeds: &[Scored], ef: usize, layer: usize) -> Vec<Scored> {
        let mut seen: HashSet<u32> = seeds.iter().map(|s| s.pos).collect();
        let mut frontier: BinaryHeap<Scored> = seeds.iter().copied().collect();
        let mut kept: BinaryHeap<Reverse<Scored>> = seeds.iter().copied().map(Reverse).collect();
        while kept.len() > ef {
            kept.pop();
        }

        while let Some(cur) = frontier.pop() {
            let worst = kept.peek().map_or(f32::NEG_INFINITY, |w| w.0.sim);
            if kept.len() >= ef && cur.sim < worst {
                break;
            }
            for &n in self.neighbors(cur.pos, layer) {
                if !seen.insert(n) {
                    continue;
                }
                let cand = self.scored(query, n);
                let worst = kept.peek().map_or(f32::NEG_INFINITY, |w| w.0.sim);
                if kept.len() < ef || cand.sim > worst {
                    frontier.push(cand);
                    kept.push(Reverse(cand));
                    if kept.len() > ef {
                        kept.pop();
                    }
                }
            }
        }

        kept.into_iter().map(|Reverse(s)| s).collect()
    }

    /// Choose up to `max_n` links out of `cands`, most similar first.
    ///
    /// A candidate is skipped when a link already chosen is strictly more
    /// similar to it than the base node is, or is a copy of it. Links then
    /// spread across directions instead of piling onto one cluster, so a
    /// distinct node stays reachable next to any number of repeated vectors.
    fn select_links(&self, mut cands: Vec<Scored>, max_n: usize) -> Vec<u32> {
        cands.sort_unstable_by(|a, b| b.cmp(a));
        let mut chosen: Vec<u32> = Vec::with_capacity(max_n);
        for cand in cands {
            if chosen.len() >= max_n {
                break;
            }
            let v = &self.nodes[cand.pos as usize].vector;
            let covered = chosen.iter().any(|&c| {
                let s = self.sim(v, c);
                s > cand.sim || s >= DUPLICATE_SIM
            });
            if !covered {
                chosen.push(cand.pos);
            }
        }
        chosen
    }

    /// Add `pos` to `neighbor`'s links on `layer`, reselecting them when
    /// the layer's fan-out overflows.
    fn link_back(&mut self, neighbor: u32, pos: u32, layer: usize) {
        let max_n = self.cfg.max_conns(layer);
        let Some(links) = self.nodes[neighbor as usize].links.get_mut(layer) else {
            return;
        };
        links.push(pos);
        if links.len() <= max_n {
            return;
        }
        let base = &self.nodes[neighbor as usize].vector;
        let cands = self.nodes[neighbor as usize].links[layer]
            .iter()
            .map(|&n| self.scored(base, n))
            .collect();
        let kept = self.select_links(cands, max_n);
        self.nodes[neighbor as usize].links[layer] = kept;
    }
}

impl VecIndex for HNSW {
    fn add(&mut self, vector: &[f32]) -> Result<usize, VecError> {
        if vector.len() != self.cfg.dim {
            return Err(VecError::DimensionMismatch {
                got: vector.len(),
                want: self.cfg.dim,
            });
        }

        let pos = self.nodes.len() as u32;
        let level = self.random_level();
        self.nodes.push(Node {
            vector: vector.to_vec(),
            links: vec![Vec::new(); level + 1],
        });

        let Some(entry) = self.entry else {
            self.entry = Some(pos);
            self.top_layer = level;
            return Ok(pos as usize);
        };

        // Layers above the new node's level are only used for routing.
        let start = self.greedy(vector, entry, (level + 1..=self.top_layer).rev());

        let mut seeds = vec![start];
        for layer in (0..=level.min(self.top_layer)).rev() {
            let found = self.beam(vector, &seeds, self.cfg.ef_construction, layer);
            let chosen = self.select_links(found.clone(), self.cfg.max_conns(layer));
            for &n in &chosen {
                self.link_back(n, pos, layer);
            }
            self.nodes[pos as usize].links[layer] = chosen;
            seeds = found;
        }

        if level > self.top_layer {
            self.entry = Some(pos);
            self.top_layer = level;
        }
        Ok(pos as usize)
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Match>, VecError> {
        if query.len() != self.cfg.dim {
            return Err(VecError::DimensionMismatch {
                got: query.len(),
                want: self.cfg.dim,
            });
        }
        let Some(entry) = self.entry else {
            return Ok(vec![]);
        };
        if top_k == 0 {
            return Ok(vec![]);
        }

        let start = self.greedy(query, entry, (1..=self.top_layer).rev());
        let ef = self.cfg.ef_search.max(top_k);
        let mut results: Vec<Match> = self
            .beam(query, &[start], ef, 0)
            .into_iter()
            .map(|s| Match {
                position: s.pos as usize,
                score: s.sim,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.position.cmp(&b.position))
        });
        results.truncate(top_k);
        Ok(results)
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn dim(&self) -> usize {
        self.cfg.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::FlatIndex;

    fn new_test_hnsw(dim: usize) -> HNSW {
        HNSW::new(HNSWConfig {
            dim,
            m: 8,
            ef_construction: 64,
            ef_search: 32,
        })
        .unwrap()
    }

    #[test]
    fn test_add_and_search() {
        let mut h = new_test_hnsw(4);
        h.add(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        h.add(&[0.0, 1.0, 0.0, 0.0]).unwrap();
        h.add(&[0.9, 0.1, 0.0, 0.0]).unwrap();

        let matches = h.search(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].position, 0);
        assert_eq!(matches[1].position, 2);
    }

    #[test]
    fn test_positions_are_dense() {
        let mut h = new_test_hnsw(3);
        for i in 0..5 {
            assert_eq!(h.add(&[1.0, i as f32, 0.0]).unwrap(), i);
        }
        assert_eq!(h.len(), 5);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut h = new_test_hnsw(4);
        assert!(h.add(&[1.0, 0.0, 0.0]).is_err());
        assert_eq!(h.len(), 0);
        h.add(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(h.search(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_search_empty() {
        let h = new_test_hnsw(3);
        assert!(h.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_top_k_zero() {
        let mut h = new_test_hnsw(3);
        h.add(&[1.0, 0.0, 0.0]).unwrap();
        assert!(h.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_single_node() {
        let mut h = new_test_hnsw(3);
        h.add(&[0.5, 0.5, 0.5]).unwrap();
        let matches = h.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position, 0);
    }

    #[test]
    fn test_zero_dim_rejected() {
        assert!(HNSW::new(HNSWConfig::default()).is_err());
    }

    #[test]
    fn test_exact_duplicate_found() {
        let mut rng = rand::thread_rng();
        let mut h = HNSW::new(HNSWConfig {
            dim: 16,
            m: 8,
            ef_construction: 64,
            ef_search: 100,
        })
        .unwrap();
        let mut target = Vec::new();
        for i in 0..300 {
            let v = rand_unit_vec(&mut rng, 16);
            if i == 123 {
                target = v.clone();
            }
            h.add(&v).unwrap();
        }
        let matches = h.search(&target, 1).unwrap();
        assert_eq!(matches[0].position, 123);
        assert!((matches[0].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_distinct_vector_survives_many_copies() {
        let dim = 8;
        let mut distinct = vec![0.0f32; dim];
        distinct[0] = 1.0;
        let mut repeated = vec![0.0f32; dim];
        repeated[1] = 1.0;

        for copies in [40, 600] {
            let mut h = HNSW::new(HNSWConfig {
                dim,
                ..Default::default()
            })
            .unwrap();
            h.add(&distinct).unwrap();
            for _ in 0..copies {
                h.add(&repeated).unwrap();
            }

            let matches = h.search(&distinct, 3).unwrap();
            assert_eq!(matches[0].position, 0, "lost after {copies} copies");
            assert!((matches[0].score - 1.0).abs() < 1e-6);

            let matches = h.search(&repeated, 3).unwrap();
            assert!(matches[0].position > 0);
            assert!((matches[0].score - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_select_links_skips_copies() {
        let mut h = new_test_hnsw(2);
        h.add(&[1.0, 0.0]).unwrap();
        h.add(&[1.0, 0.0]).unwrap();
        h.add(&[0.0, 1.0]).unwrap();

        let base = [1.0, 0.0];
        let cands = (0..3).map(|p| h.scored(&base, p)).collect();
        // Either copy may win the tie; the other is skipped.
        let links = h.select_links(cands, 3);
        assert_eq!(links.len(), 2);
        assert!(links.contains(&2));
    }

    #[test]
    fn test_recall() {
        let dim = 32;
        let n = 2000;
        let queries = 50;
        let top_k = 10;

        let mut rng = rand::thread_rng();

        let mut h = HNSW::new(HNSWConfig {
            dim,
            m: 16,
            ef_construction: 128,
            ef_search: 64,
        })
        .unwrap();
        let mut truth_index = FlatIndex::new(dim);

        for _ in 0..n {
            let v = rand_unit_vec(&mut rng, dim);
            h.add(&v).unwrap();
            truth_index.add(&v).unwrap();
        }

        let mut total_recall = 0.0;
        for _ in 0..queries {
            let query = rand_unit_vec(&mut rng, dim);

            let truth_set: HashSet<usize> = truth_index
                .search(&query, top_k)
                .unwrap()
                .into_iter()
                .map(|m| m.position)
                .collect();

            let matches = h.search(&query, top_k).unwrap();
            let hits = matches
                .iter()
                .filter(|m| truth_set.contains(&m.position))
                .count();
            total_recall += hits as f64 / top_k as f64;
        }

        let avg_recall = total_recall / queries as f64;
        assert!(
            avg_recall >= 0.80,
            "recall {avg_recall:.3} is below 0.80 threshold"
        );
    }

    fn rand_unit_vec(rng: &mut impl rand::Rng, dim: usize) -> Vec<f32> {
        let v: Vec<f32> = (0..dim).map(|_| rng.r#gen::<f32>() - 0.5).collect();
        let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
        if norm > 0.0 {
            v.into_iter().map(|x| x / norm as f32).collect()
        } else {
            v
        }
    }
}
