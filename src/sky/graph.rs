//! Proximity graph and cluster extraction
//!
//! Turns the full body set into clusters: connected components of the
//! "closer than the threshold" relation with at least three members. Pure and
//! deterministic: identical input yields identical clusters in identical order.

use std::collections::VecDeque;

use bitvec::prelude::*;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::sky::body::{BodyId, CelestialBody};
use crate::sky::constants::constellation::{MIN_MEMBERS, PROXIMITY_THRESHOLD};
use crate::sky::spatial::ProximityGrid;

/// Neighbor list for one body (indices into the input slice, ascending)
pub type Neighbors = SmallVec<[usize; 8]>;

/// A connected group of bodies eligible for constellation status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Member ids in input order
    members: Vec<BodyId>,
}

impl Cluster {
    pub fn members(&self) -> &[BodyId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_set(&self) -> FxHashSet<BodyId> {
        self.members.iter().copied().collect()
    }
}

/// Builds the proximity graph and extracts clusters
#[derive(Debug, Clone, Copy)]
pub struct SpatialGraphBuilder {
    threshold: f32,
    min_members: usize,
}

impl Default for SpatialGraphBuilder {
    fn default() -> Self {
        Self {
            threshold: PROXIMITY_THRESHOLD,
            min_members: MIN_MEMBERS,
        }
    }
}

impl SpatialGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with a custom proximity threshold
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Adjacency lists: `result[i]` holds every `j` with
    /// `distance(bodies[i], bodies[j]) < threshold`, ascending.
    pub fn adjacency(&self, bodies: &[CelestialBody]) -> Vec<Neighbors> {
        let mut adjacency: Vec<Neighbors> = vec![Neighbors::new(); bodies.len()];
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return adjacency;
        }

        let threshold_sq = self.threshold * self.threshold;
        let grid = ProximityGrid::from_positions(self.threshold, bodies.iter().map(|b| b.position));

        grid.for_each_candidate_pair(|a, b| {
            if a.position.distance_sq_to(b.position) < threshold_sq {
                adjacency[a.index].push(b.index);
                adjacency[b.index].push(a.index);
            }
        });

        // Grid visit order is hash order; sort for deterministic traversal
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }

        adjacency
    }

    /// Extract clusters of at least three bodies.
    ///
    /// Clusters are ordered by the input position of their earliest member,
    /// and each cluster lists its members in input order.
    pub fn clusters(&self, bodies: &[CelestialBody]) -> Vec<Cluster> {
        if bodies.len() < self.min_members {
            return Vec::new();
        }

        let adjacency = self.adjacency(bodies);
        let mut visited = bitvec![0; bodies.len()];
        let mut queue = VecDeque::new();
        let mut clusters = Vec::new();

        for start in 0..bodies.len() {
            if visited[start] {
                continue;
            }

            // Breadth-first walk of the component containing `start`
            let mut component = vec![start];
            visited.set(start, true);
            queue.push_back(start);

            while let Some(current) = queue.pop_front() {
                for &next in &adjacency[current] {
                    if !visited[next] {
                        visited.set(next, true);
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }

            if component.len() >= self.min_members {
                component.sort_unstable();
                clusters.push(Cluster {
                    members: component.into_iter().map(|i| bodies[i].id).collect(),
                });
            }
        }

        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sky::test_support::{body_at, scatter};
    use crate::util::vec2::Vec2;

    /// Reference all-pairs adjacency
    fn brute_force_adjacency(bodies: &[CelestialBody], threshold: f32) -> Vec<Vec<usize>> {
        (0..bodies.len())
            .map(|i| {
                (0..bodies.len())
                    .filter(|&j| j != i && bodies[i].position.distance_sq_to(bodies[j].position) < threshold * threshold)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_extreme_positions_do_not_panic() {
        let mut bodies = vec![body_at(0.0, 0.0), body_at(0.0, 0.0), body_at(40.0, 40.0), body_at(80.0, 0.0)];
        bodies[0].position = Vec2::new(1e30, 1e30);
        bodies[1].position = Vec2::new(-1e30, f32::MAX);

        let clusters = SpatialGraphBuilder::new().clusters(&bodies);
        assert!(clusters.is_empty());

        bodies[1].position = Vec2::new(1e30, 1e30);
        bodies.push(body_at(20.0, 60.0));
        let clusters = SpatialGraphBuilder::new().clusters(&bodies);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn test_empty_and_small_inputs() {
        let builder = SpatialGraphBuilder::new();
        assert!(builder.clusters(&[]).is_empty());

        let two = vec![body_at(0.0, 0.0), body_at(10.0, 10.0)];
        assert!(builder.clusters(&two).is_empty());
    }

    #[test]
    fn test_three_close_bodies_form_cluster() {
        let bodies = vec![body_at(0.0, 0.0), body_at(50.0, 50.0), body_at(90.0, 90.0)];
        let clusters = SpatialGraphBuilder::new().clusters(&bodies);

        assert_eq!(clusters.len(), 1);
        let ids: Vec<BodyId> = bodies.iter().map(|b| b.id).collect();
        assert_eq!(clusters[0].members(), ids.as_slice());
    }

    #[test]
    fn test_distant_pair_never_clusters() {
        let bodies = vec![body_at(0.0, 0.0), body_at(300.0, 0.0)];
        assert!(SpatialGraphBuilder::new().clusters(&bodies).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        // Exactly 180 apart: not adjacent, so the chain breaks into a pair and a single
        let bodies = vec![body_at(0.0, 0.0), body_at(100.0, 0.0), body_at(280.0, 0.0)];
        assert!(SpatialGraphBuilder::new().clusters(&bodies).is_empty());

        let bodies = vec![body_at(0.0, 0.0), body_at(100.0, 0.0), body_at(279.5, 0.0)];
        assert_eq!(SpatialGraphBuilder::new().clusters(&bodies).len(), 1);
    }

    #[test]
    fn test_transitive_chain() {
        // Ends are 340 apart but connected through the middle body
        let bodies = vec![body_at(0.0, 500.0), body_at(170.0, 500.0), body_at(340.0, 500.0)];
        let clusters = SpatialGraphBuilder::new().clusters(&bodies);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn test_isolated_and_pairs_excluded() {
        let bodies = vec![
            // Triangle
            body_at(100.0, 100.0),
            body_at(150.0, 120.0),
            body_at(120.0, 160.0),
            // Pair
            body_at(800.0, 800.0),
            body_at(850.0, 800.0),
            // Isolated
            body_at(500.0, 900.0),
        ];
        let clusters = SpatialGraphBuilder::new().clusters(&bodies);

        assert_eq!(clusters.len(), 1);
        let set = clusters[0].member_set();
        assert!(set.contains(&bodies[0].id));
        assert!(set.contains(&bodies[1].id));
        assert!(set.contains(&bodies[2].id));
        assert!(!set.contains(&bodies[3].id));
    }

    #[test]
    fn test_cluster_order_follows_earliest_member() {
        let bodies = vec![
            body_at(900.0, 900.0),
            body_at(10.0, 10.0),
            body_at(920.0, 900.0),
            body_at(20.0, 10.0),
            body_at(940.0, 900.0),
            body_at(30.0, 10.0),
        ];
        let clusters = SpatialGraphBuilder::new().clusters(&bodies);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members(), &[bodies[0].id, bodies[2].id, bodies[4].id]);
        assert_eq!(clusters[1].members(), &[bodies[1].id, bodies[3].id, bodies[5].id]);
    }

    #[test]
    fn test_grid_matches_brute_force() {
        let builder = SpatialGraphBuilder::new();
        for seed in 0..8 {
            let bodies = scatter(seed, 150);
            let fast = builder.adjacency(&bodies);
            let slow = brute_force_adjacency(&bodies, builder.threshold());

            for (i, (f, s)) in fast.iter().zip(&slow).enumerate() {
                assert_eq!(f.as_slice(), s.as_slice(), "seed {} body {}", seed, i);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let builder = SpatialGraphBuilder::new();
        let bodies = scatter(7, 120);
        assert_eq!(builder.clusters(&bodies), builder.clusters(&bodies));
    }

    #[test]
    fn test_clusters_are_components() {
        let builder = SpatialGraphBuilder::new();
        for seed in 0..8 {
            let bodies = scatter(seed, 60);
            let clusters = builder.clusters(&bodies);
            let mut seen = FxHashSet::default();

            for cluster in &clusters {
                assert!(cluster.len() >= MIN_MEMBERS);
                for id in cluster.members() {
                    assert!(seen.insert(*id), "body in two clusters");
                }
            }

            // No body outside a cluster may be adjacent to a cluster member
            let adjacency = builder.adjacency(&bodies);
            for (i, body) in bodies.iter().enumerate() {
                if seen.contains(&body.id) {
                    continue;
                }
                for &j in &adjacency[i] {
                    assert!(!seen.contains(&bodies[j].id));
                }
            }
        }
    }

    #[test]
    fn test_invalid_threshold_yields_nothing() {
        let bodies = vec![body_at(0.0, 0.0), body_at(1.0, 0.0), body_at(2.0, 0.0)];
        assert!(SpatialGraphBuilder::with_threshold(0.0).clusters(&bodies).is_empty());
        assert!(SpatialGraphBuilder::with_threshold(f32::NAN).clusters(&bodies).is_empty());
    }
}
