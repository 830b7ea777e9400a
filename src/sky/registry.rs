//! Constellation reconciliation
//!
//! Each pass rebuilds the proximity clusters from the full body set and
//! diffs them against the recorded constellations:
//!
//! - no overlap: a new constellation is founded, named, and rewarded
//! - one overlap: the constellation grows to cover the cluster
//! - several overlaps: everything folds into the oldest one
//!
//! Only founding emits a discovery event. The registry keeps no state of
//! its own; the constellation set goes in by value and comes back updated.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::body::CelestialBody;
use super::constants::constellation::MIN_MEMBERS;
use super::constellation::{ConstellationId, ConstellationSet, Reward};
use super::graph::{Cluster, SpatialGraphBuilder};
use crate::oracle::{constellation_name_or_fallback, NamingOracle, Provenance};

/// A newly founded constellation and its payout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstellationDiscovered {
    pub id: ConstellationId,
    pub name: String,
    pub member_count: usize,
    pub reward: Reward,
    pub name_source: Provenance,
}

/// One structural change made during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ReconcileChange {
    Created {
        id: ConstellationId,
    },
    Extended {
        id: ConstellationId,
        added: usize,
    },
    Merged {
        target: ConstellationId,
        absorbed: Vec<ConstellationId>,
        added: usize,
    },
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub constellations: ConstellationSet,
    pub discoveries: Vec<ConstellationDiscovered>,
    pub changes: Vec<ReconcileChange>,
}

impl Reconciliation {
    /// Whether the pass changed anything
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Reconciles proximity clusters into persistent constellations
pub struct ConstellationRegistry<'a, N: NamingOracle> {
    builder: SpatialGraphBuilder,
    namer: &'a N,
    naming_timeout: Duration,
}

impl<'a, N: NamingOracle> ConstellationRegistry<'a, N> {
    pub fn new(namer: &'a N, naming_timeout: Duration) -> Self {
        Self {
            builder: SpatialGraphBuilder::new(),
            namer,
            naming_timeout,
        }
    }

    /// Run one reconciliation pass over the full body set
    pub async fn reconcile(
        &self,
        bodies: &[CelestialBody],
        mut constellations: ConstellationSet,
    ) -> Reconciliation {
        if bodies.len() < MIN_MEMBERS {
            return Reconciliation {
                constellations,
                ..Reconciliation::default()
            };
        }

        let clusters = self.builder.clusters(bodies);
        let mut discoveries = Vec::new();
        let mut changes = Vec::new();

        for cluster in &clusters {
            let overlaps = constellations.overlapping(&cluster.member_set());

            match overlaps.as_slice() {
                [] => {
                    let discovered = self.found(&mut constellations, cluster).await;
                    changes.push(ReconcileChange::Created { id: discovered.id });
                    discoveries.push(discovered);
                }
                [id] => {
                    if let Some(change) = Self::grow(&mut constellations, *id, cluster) {
                        changes.push(change);
                    }
                }
                [target, rest @ ..] => {
                    let added = constellations.merge(*target, rest, cluster.members());
                    debug!(
                        "Merged {} constellations into {} (+{} bodies)",
                        rest.len(),
                        target,
                        added
                    );
                    changes.push(ReconcileChange::Merged {
                        target: *target,
                        absorbed: rest.to_vec(),
                        added,
                    });
                }
            }
        }

        let verified = constellations.verify();
        if let Err(violation) = &verified {
            error!("Constellation invariant violated after reconcile: {}", violation);
        }
        debug_assert!(verified.is_ok(), "constellation invariant violated");

        Reconciliation {
            constellations,
            discoveries,
            changes,
        }
    }

    /// Found a constellation for a cluster that touches none
    async fn found(
        &self,
        constellations: &mut ConstellationSet,
        cluster: &Cluster,
    ) -> ConstellationDiscovered {
        let size = cluster.len();
        let (name, name_source) = constellation_name_or_fallback(
            self.namer,
            size,
            constellations.next_sequence(),
            self.naming_timeout,
        )
        .await;

        let id = constellations.found(name.clone(), cluster.members().iter().copied(), Utc::now());
        let reward = Reward::for_cluster_size(size);

        info!(
            "Constellation discovered: {} ({} bodies, +{} starlight, +{} data)",
            name, size, reward.starlight, reward.data
        );

        ConstellationDiscovered {
            id,
            name,
            member_count: size,
            reward,
            name_source,
        }
    }

    /// Extend the single overlapping constellation, if the cluster adds anything
    fn grow(
        constellations: &mut ConstellationSet,
        id: ConstellationId,
        cluster: &Cluster,
    ) -> Option<ReconcileChange> {
        if let Some(existing) = constellations.get(id) {
            let cluster_set = cluster.member_set();
            if let Some(missing) = existing.members().iter().find(|m| !cluster_set.contains(*m)) {
                // Bodies never move or vanish, so a component cannot lose members
                warn!(
                    "Cluster does not cover constellation {} (missing body {}), taking the union",
                    id, missing
                );
            }
        }

        let added = constellations.extend(id, cluster.members());
        if added == 0 {
            return None;
        }

        debug!("Extended constellation {} by {} bodies", id, added);
        Some(ReconcileChange::Extended { id, added })
    }
}
