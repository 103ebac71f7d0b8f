//! HNSW (Hierarchical Navigable Small World) graph for approximate
//! nearest-neighbor search.
//!
//! The graph is a batch-built, immutable structure: the maintenance task
//! builds it from the rows present at build time and swaps it in atomically,
//! while queries only read it. Rows ingested after a build are not in the
//! graph; the semantic searcher covers them with an exact scan until the next
//! rebuild.
//!
//! Being approximate, the graph trades a small, bounded recall loss for
//! sub-linear query cost. The `ef_search` knob widens the candidate list at
//! higher cost; construction quality is governed by `ef_construction`. Layer
//! assignment is seeded, so the same input rows always produce the same graph.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};
use crate::vector::{Vector, cosine_distance};

/// Configuration for HNSW graph construction and search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Maximum number of connections per node in layer 0.
    pub m: usize,
    /// Maximum number of connections per node in higher layers.
    pub m_upper: usize,
    /// Multiplier controlling the probability of layer assignment.
    pub level_lambda: f64,
    /// Size of the candidate list during construction.
    pub ef_construction: usize,
    /// Default size of the candidate list during search. The per-query
    /// candidate budget is `max(ef_search, requested candidates)`.
    pub ef_search: usize,
    /// Seed for layer assignment, fixed so rebuilds are reproducible.
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            m_upper: 8,
            level_lambda: 1.0 / (2.0_f64.ln()),
            ef_construction: 200,
            ef_search: 64,
            seed: 42,
        }
    }
}

impl HnswConfig {
    /// Set the M parameter; the upper-layer cap follows as `m / 2`.
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self.m_upper = (m / 2).max(1);
        self
    }

    /// Set the construction candidate-list size.
    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    /// Set the search candidate-list size.
    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(TesseraError::invalid_operation("HNSW m must be > 0"));
        }
        if self.ef_construction < self.m {
            return Err(TesseraError::invalid_operation(
                "HNSW ef_construction must be >= m",
            ));
        }
        Ok(())
    }
}

/// A node in the graph: one indexed row's normalized vector plus its
/// per-layer connections.
#[derive(Debug, Clone)]
struct HnswNode {
    row_id: u64,
    vector: Vec<f32>,
    /// `connections[layer]` holds the node ids connected at that layer.
    connections: Vec<AHashSet<usize>>,
    max_layer: usize,
}

impl HnswNode {
    fn new(row_id: u64, vector: Vec<f32>, max_layer: usize) -> Self {
        Self {
            row_id,
            vector,
            connections: vec![AHashSet::new(); max_layer + 1],
            max_layer,
        }
    }

    fn neighbors(&self, layer: usize) -> impl Iterator<Item = usize> + '_ {
        self.connections
            .get(layer)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }
}

/// Priority-queue entry during graph traversal.
#[derive(Debug, Clone, PartialEq)]
struct SearchCandidate {
    distance: f32,
    node_id: usize,
}

impl Eq for SearchCandidate {}

impl PartialOrd for SearchCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchCandidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

/// An immutable HNSW graph over a set of rows.
#[derive(Debug)]
pub struct HnswGraph {
    config: HnswConfig,
    dimension: usize,
    nodes: Vec<HnswNode>,
    by_row: AHashMap<u64, usize>,
    entry_point: Option<usize>,
    max_layer: usize,
}

impl HnswGraph {
    /// Build a graph over the given `(row id, vector)` pairs.
    ///
    /// Vectors are normalized on the way in, so cosine distance degenerates to
    /// `1 − dot`. Every vector must match `dimension` and be finite; a
    /// duplicate row id is a caller bug and fails the build.
    pub fn build<I>(dimension: usize, config: HnswConfig, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u64, Vector)>,
    {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut graph = Self {
            config,
            dimension,
            nodes: Vec::new(),
            by_row: AHashMap::new(),
            entry_point: None,
            max_layer: 0,
        };

        for (row_id, vector) in items {
            vector.validate_dimension(dimension)?;
            if !vector.is_valid() {
                return Err(TesseraError::invalid_operation(format!(
                    "vector for row {row_id} contains non-finite values"
                )));
            }
            graph.insert(row_id, vector.normalized().data, &mut rng)?;
        }

        Ok(graph)
    }

    /// Number of rows in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no rows.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The vector dimension this graph was built for.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Whether the given row is covered by this graph.
    pub fn contains(&self, row_id: u64) -> bool {
        self.by_row.contains_key(&row_id)
    }

    /// Search for the `k` nearest rows to `query`, widening the candidate
    /// list to at least `ef`.
    ///
    /// Returns `(row id, cosine distance)` pairs sorted by ascending
    /// distance. The result is approximate: low-similarity tail items may
    /// differ between graphs built from different row orders, which is why
    /// callers re-sort with a deterministic tie-break.
    pub fn search(&self, query: &[f32], ef: usize, k: usize) -> Vec<(u64, f32)> {
        let Some(entry_point) = self.entry_point else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let query = Vector::new(query.to_vec()).normalized().data;

        // Greedy descent through the upper layers with a single candidate.
        let mut closest = vec![entry_point];
        for layer in (1..=self.max_layer).rev() {
            closest = self
                .search_layer(&query, &closest, 1, layer)
                .into_iter()
                .map(|c| c.node_id)
                .collect();
        }

        // Widen at layer 0.
        let ef = ef.max(k).max(self.config.ef_search);
        let candidates = self.search_layer(&query, &closest, ef, 0);

        candidates
            .into_iter()
            .take(k)
            .map(|c| (self.nodes[c.node_id].row_id, c.distance))
            .collect()
    }

    fn insert(&mut self, row_id: u64, vector: Vec<f32>, rng: &mut StdRng) -> Result<()> {
        if self.by_row.contains_key(&row_id) {
            return Err(TesseraError::invalid_operation(format!(
                "row {row_id} inserted twice during graph build"
            )));
        }

        let layer = Self::select_layer(rng, self.config.level_lambda);
        let node_id = self.nodes.len();
        self.nodes.push(HnswNode::new(row_id, vector, layer));
        self.by_row.insert(row_id, node_id);

        // Connect through the previous entry point before possibly becoming
        // the entry point ourselves.
        if let Some(entry) = self.entry_point {
            self.connect(node_id, entry);
        }
        if self.entry_point.is_none() || layer > self.max_layer {
            self.entry_point = Some(node_id);
            self.max_layer = layer;
        }

        Ok(())
    }

    fn select_layer(rng: &mut StdRng, lambda: f64) -> usize {
        let uniform: f64 = rng.random();
        (-uniform.ln() * lambda).floor() as usize
    }

    fn connect(&mut self, node_id: usize, entry: usize) {
        let target_layer = self.nodes[node_id].max_layer;
        let query = self.nodes[node_id].vector.clone();

        // Descend to the first layer the new node participates in.
        let mut closest = vec![entry];
        for layer in ((target_layer + 1)..=self.max_layer).rev() {
            closest = self
                .search_layer(&query, &closest, 1, layer)
                .into_iter()
                .map(|c| c.node_id)
                .collect();
        }

        // Connect downwards, layer by layer.
        for layer in (0..=target_layer.min(self.max_layer)).rev() {
            let max_connections = self.max_connections(layer);
            let candidates =
                self.search_layer(&query, &closest, self.config.ef_construction, layer);

            let selected: Vec<usize> = candidates
                .iter()
                .take(max_connections)
                .map(|c| c.node_id)
                .collect();

            for &neighbor_id in &selected {
                self.nodes[node_id].connections[layer].insert(neighbor_id);
                self.nodes[neighbor_id].connections[layer].insert(node_id);
                if self.nodes[neighbor_id].connections[layer].len() > max_connections {
                    self.prune(neighbor_id, layer, max_connections);
                }
            }

            closest = if selected.is_empty() {
                closest
            } else {
                selected
            };
        }
    }

    fn max_connections(&self, layer: usize) -> usize {
        if layer == 0 {
            self.config.m
        } else {
            self.config.m_upper
        }
    }

    /// Keep only the `max_connections` nearest neighbors of a node at a layer.
    fn prune(&mut self, node_id: usize, layer: usize, max_connections: usize) {
        let anchor = self.nodes[node_id].vector.clone();
        let mut ranked: Vec<SearchCandidate> = self.nodes[node_id]
            .neighbors(layer)
            .map(|neighbor_id| SearchCandidate {
                distance: cosine_distance(&anchor, &self.nodes[neighbor_id].vector),
                node_id: neighbor_id,
            })
            .collect();
        ranked.sort();

        let keep: AHashSet<usize> = ranked
            .into_iter()
            .take(max_connections)
            .map(|c| c.node_id)
            .collect();
        self.nodes[node_id].connections[layer].retain(|id| keep.contains(id));
    }

    /// Best-first expansion at one layer, returning up to `num_closest`
    /// candidates sorted by ascending distance.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[usize],
        num_closest: usize,
        layer: usize,
    ) -> Vec<SearchCandidate> {
        let mut visited = AHashSet::new();
        // Exploration queue, closest first.
        let mut to_visit = BinaryHeap::new();
        // Running result set; the farthest member sits on top.
        let mut nearest = BinaryHeap::new();

        for &entry_id in entry_points {
            if let Some(node) = self.nodes.get(entry_id)
                && visited.insert(entry_id)
            {
                let candidate = SearchCandidate {
                    distance: cosine_distance(query, &node.vector),
                    node_id: entry_id,
                };
                to_visit.push(Reverse(candidate.clone()));
                nearest.push(candidate);
            }
        }

        while let Some(Reverse(current)) = to_visit.pop() {
            if let Some(farthest) = nearest.peek()
                && nearest.len() >= num_closest
                && current.distance > farthest.distance
            {
                break;
            }

            for neighbor_id in self.nodes[current.node_id].neighbors(layer) {
                if !visited.insert(neighbor_id) {
                    continue;
                }
                let candidate = SearchCandidate {
                    distance: cosine_distance(query, &self.nodes[neighbor_id].vector),
                    node_id: neighbor_id,
                };

                if nearest.len() < num_closest {
                    nearest.push(candidate.clone());
                    to_visit.push(Reverse(candidate));
                } else if let Some(farthest) = nearest.peek()
                    && candidate.distance < farthest.distance
                {
                    nearest.pop();
                    nearest.push(candidate.clone());
                    to_visit.push(Reverse(candidate));
                }
            }
        }

        // Ascending distance, closest first.
        nearest.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_vector(dimension: usize, axis: usize) -> Vector {
        let mut data = vec![0.0; dimension];
        data[axis] = 1.0;
        Vector::new(data)
    }

    fn build_small_graph() -> HnswGraph {
        let items = vec![
            (1, axis_vector(4, 0)),
            (2, axis_vector(4, 1)),
            (3, axis_vector(4, 2)),
            (4, Vector::new(vec![0.9, 0.1, 0.0, 0.0])),
        ];
        HnswGraph::build(4, HnswConfig::default(), items).unwrap()
    }

    #[test]
    fn test_build_and_search_returns_nearest_first() {
        let graph = build_small_graph();
        assert_eq!(graph.len(), 4);

        let results = graph.search(&[1.0, 0.0, 0.0, 0.0], 16, 4);
        assert_eq!(results.len(), 4);
        // Row 1 is the exact match, row 4 the near match.
        assert_eq!(results[0].0, 1);
        assert!(results[0].1.abs() < 1e-5);
        assert_eq!(results[1].0, 4);
        // Distances ascend.
        for pair in results.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn test_empty_graph_returns_nothing() {
        let graph = HnswGraph::build(4, HnswConfig::default(), Vec::new()).unwrap();
        assert!(graph.is_empty());
        assert!(graph.search(&[1.0, 0.0, 0.0, 0.0], 16, 5).is_empty());
    }

    #[test]
    fn test_contains_tracks_rows() {
        let graph = build_small_graph();
        assert!(graph.contains(1));
        assert!(!graph.contains(99));
    }

    #[test]
    fn test_duplicate_row_fails_build() {
        let items = vec![(1, axis_vector(2, 0)), (1, axis_vector(2, 1))];
        assert!(HnswGraph::build(2, HnswConfig::default(), items).is_err());
    }

    #[test]
    fn test_dimension_mismatch_fails_build() {
        let items = vec![(1, axis_vector(3, 0))];
        assert!(HnswGraph::build(4, HnswConfig::default(), items).is_err());
    }

    #[test]
    fn test_builds_are_reproducible() {
        let items: Vec<(u64, Vector)> = (0..50)
            .map(|i| {
                let mut data = vec![0.0; 8];
                data[(i % 8) as usize] = 1.0;
                data[((i + 3) % 8) as usize] = 0.5;
                (i, Vector::new(data))
            })
            .collect();

        let a = HnswGraph::build(8, HnswConfig::default(), items.clone()).unwrap();
        let b = HnswGraph::build(8, HnswConfig::default(), items).unwrap();

        let query = [1.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let hits_a = a.search(&query, 32, 10);
        let hits_b = b.search(&query, 32, 10);
        assert_eq!(hits_a, hits_b);
    }

    #[test]
    fn test_recall_matches_exact_scan_on_small_corpus() {
        let items: Vec<(u64, Vector)> = (0..30)
            .map(|i| {
                let angle = i as f32 * 0.2;
                (i, Vector::new(vec![angle.cos(), angle.sin()]))
            })
            .collect();
        let graph = HnswGraph::build(2, HnswConfig::default(), items.clone()).unwrap();

        let query = [1.0, 0.0];
        let approx: Vec<u64> = graph.search(&query, 64, 5).into_iter().map(|r| r.0).collect();

        let mut exact: Vec<(u64, f32)> = items
            .iter()
            .map(|(id, v)| (*id, cosine_distance(&query, &v.data)))
            .collect();
        exact.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        let exact: Vec<u64> = exact.into_iter().take(5).map(|r| r.0).collect();

        // With ef well above the corpus size the graph search is exhaustive.
        assert_eq!(approx, exact);
    }
}
