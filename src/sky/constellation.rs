//! Constellations and the arena that holds them
//!
//! A constellation is a named, persistent group of at least three bodies.
//! Member sets of distinct constellations never overlap. Constellations only
//! grow (extend), or disappear when absorbed into an older one during a
//! multi-way merge.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sky::body::BodyId;
use crate::sky::constants::{constellation::MIN_MEMBERS, reward};

/// Unique constellation identifier
pub type ConstellationId = Uuid;

/// Resource payout for a newly discovered constellation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub starlight: u64,
    pub data: u64,
}

impl Reward {
    /// `50 + 10n` starlight and `20 + 5n` data for a cluster of `n` bodies
    pub fn for_cluster_size(size: usize) -> Self {
        let n = size as u64;
        Self {
            starlight: reward::STARLIGHT_BASE + reward::STARLIGHT_PER_MEMBER * n,
            data: reward::DATA_BASE + reward::DATA_PER_MEMBER * n,
        }
    }
}

/// A named group of bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constellation {
    /// Unique constellation identifier
    pub id: ConstellationId,
    /// Display name, fixed at creation
    pub name: String,
    /// Member bodies, unique, in the order they joined
    members: Vec<BodyId>,
    /// When the constellation was first recorded
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// Creation sequence number, breaks `created_at` ties
    #[serde(default)]
    pub sequence: u64,
}

impl Constellation {
    pub fn members(&self) -> &[BodyId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, body: BodyId) -> bool {
        self.members.contains(&body)
    }

    /// Ordering key for the merge tie-break: oldest first, then by id so
    /// saves without timestamps or sequence numbers still order totally
    fn age_key(&self) -> (DateTime<Utc>, u64, ConstellationId) {
        (self.created_at, self.sequence, self.id)
    }

    /// Append ids not already present; returns how many were added
    fn absorb(&mut self, ids: impl IntoIterator<Item = BodyId>) -> usize {
        let mut present: FxHashSet<BodyId> = self.members.iter().copied().collect();
        let before = self.members.len();
        for id in ids {
            if present.insert(id) {
                self.members.push(id);
            }
        }
        self.members.len() - before
    }
}

/// Structural defects in a constellation set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("Constellation {id} has only {count} members")]
    TooFewMembers { id: ConstellationId, count: usize },
    #[error("Body {body} belongs to both {first} and {second}")]
    SharedBody {
        body: BodyId,
        first: ConstellationId,
        second: ConstellationId,
    },
}

/// Arena of constellations keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Constellation>", into = "Vec<Constellation>")]
pub struct ConstellationSet {
    entries: HashMap<ConstellationId, Constellation>,
    next_sequence: u64,
}

impl ConstellationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ConstellationId) -> Option<&Constellation> {
        self.entries.get(&id)
    }

    /// Sequence number the next founded constellation will receive
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Constellations oldest first
    pub fn ordered(&self) -> Vec<&Constellation> {
        let mut all: Vec<&Constellation> = self.entries.values().collect();
        all.sort_by_key(|c| c.age_key());
        all
    }

    /// Record a new constellation and return its id
    pub fn found(
        &mut self,
        name: String,
        members: impl IntoIterator<Item = BodyId>,
        created_at: DateTime<Utc>,
    ) -> ConstellationId {
        let mut constellation = Constellation {
            id: Uuid::new_v4(),
            name,
            members: Vec::new(),
            created_at,
            sequence: self.next_sequence,
        };
        constellation.absorb(members);
        self.next_sequence += 1;

        let id = constellation.id;
        self.entries.insert(id, constellation);
        id
    }

    /// Add `members` to an existing constellation; returns how many were new
    pub fn extend(&mut self, id: ConstellationId, members: &[BodyId]) -> usize {
        match self.entries.get_mut(&id) {
            Some(constellation) => constellation.absorb(members.iter().copied()),
            None => 0,
        }
    }

    /// Fold every constellation in `absorbed` plus `members` into `target`,
    /// removing the absorbed entries. Returns how many ids the target gained.
    pub fn merge(
        &mut self,
        target: ConstellationId,
        absorbed: &[ConstellationId],
        members: &[BodyId],
    ) -> usize {
        if !self.entries.contains_key(&target) {
            return 0;
        }

        let mut incoming: Vec<BodyId> = Vec::new();
        for id in absorbed.iter().filter(|&&id| id != target) {
            if let Some(other) = self.entries.remove(id) {
                incoming.extend(other.members);
            }
        }
        incoming.extend_from_slice(members);

        self.entries
            .get_mut(&target)
            .map(|c| c.absorb(incoming))
            .unwrap_or(0)
    }

    /// Ids of constellations sharing at least one body with `cluster`, oldest first
    pub fn overlapping(&self, cluster: &FxHashSet<BodyId>) -> Vec<ConstellationId> {
        let mut hits: Vec<&Constellation> = self
            .entries
            .values()
            .filter(|c| c.members.iter().any(|m| cluster.contains(m)))
            .collect();
        hits.sort_by_key(|c| c.age_key());
        hits.into_iter().map(|c| c.id).collect()
    }

    /// Constellation containing `body`, if any
    pub fn owner_of(&self, body: BodyId) -> Option<ConstellationId> {
        self.entries
            .values()
            .find(|c| c.contains(body))
            .map(|c| c.id)
    }

    /// Check minimum size and pairwise disjointness
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let mut owners: HashMap<BodyId, ConstellationId> = HashMap::new();
        for constellation in self.ordered() {
            if constellation.len() < MIN_MEMBERS {
                return Err(InvariantViolation::TooFewMembers {
                    id: constellation.id,
                    count: constellation.len(),
                });
            }
            for &body in &constellation.members {
                if let Some(&first) = owners.get(&body) {
                    return Err(InvariantViolation::SharedBody {
                        body,
                        first,
                        second: constellation.id,
                    });
                }
                owners.insert(body, constellation.id);
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_sequence = 0;
    }
}

impl From<Vec<Constellation>> for ConstellationSet {
    fn from(list: Vec<Constellation>) -> Self {
        let next_sequence = list.iter().map(|c| c.sequence + 1).max().unwrap_or(0);
        Self {
            entries: list.into_iter().map(|c| (c.id, c)).collect(),
            next_sequence,
        }
    }
}

impl From<ConstellationSet> for Vec<Constellation> {
    fn from(set: ConstellationSet) -> Self {
        let mut list: Vec<Constellation> = set.entries.into_values().collect();
        list.sort_by_key(|c| c.age_key());
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<BodyId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn set_of(ids: &[BodyId]) -> FxHashSet<BodyId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_reward_formula() {
        assert_eq!(Reward::for_cluster_size(3), Reward { starlight: 80, data: 35 });
        assert_eq!(Reward::for_cluster_size(7), Reward { starlight: 120, data: 55 });
    }

    #[test]
    fn test_found_assigns_sequence() {
        let mut set = ConstellationSet::new();
        let body_ids = ids(6);
        let now = Utc::now();

        let a = set.found("Lyra".into(), body_ids[..3].to_vec(), now);
        let b = set.found("Draco".into(), body_ids[3..].to_vec(), now);

        assert_eq!(set.get(a).unwrap().sequence, 0);
        assert_eq!(set.get(b).unwrap().sequence, 1);
        assert_eq!(set.next_sequence(), 2);
    }

    #[test]
    fn test_found_dedups_members() {
        let mut set = ConstellationSet::new();
        let body_ids = ids(3);
        let mut with_dup = body_ids.clone();
        with_dup.push(body_ids[0]);

        let id = set.found("Lyra".into(), with_dup, Utc::now());
        assert_eq!(set.get(id).unwrap().members(), body_ids.as_slice());
    }

    #[test]
    fn test_extend_adds_only_new() {
        let mut set = ConstellationSet::new();
        let body_ids = ids(4);
        let id = set.found("Lyra".into(), body_ids[..3].to_vec(), Utc::now());

        assert_eq!(set.extend(id, &body_ids), 1);
        assert_eq!(set.extend(id, &body_ids), 0);
        assert_eq!(set.get(id).unwrap().len(), 4);
    }

    #[test]
    fn test_merge_into_target() {
        let mut set = ConstellationSet::new();
        let body_ids = ids(7);
        let now = Utc::now();
        let a = set.found("Lyra".into(), body_ids[..3].to_vec(), now);
        let b = set.found("Draco".into(), body_ids[3..6].to_vec(), now);

        let added = set.merge(a, &[b], &body_ids);

        assert_eq!(added, 4);
        assert_eq!(set.len(), 1);
        assert!(set.get(b).is_none());
        assert_eq!(set.get(a).unwrap().len(), 7);
    }

    #[test]
    fn test_overlapping_oldest_first() {
        let mut set = ConstellationSet::new();
        let body_ids = ids(6);
        let earlier = Utc::now() - chrono::Duration::minutes(5);
        let later = Utc::now();

        // Inserted newest first to make sure ordering is not insertion order
        let young = set.found("Young".into(), body_ids[3..].to_vec(), later);
        let old = set.found("Old".into(), body_ids[..3].to_vec(), earlier);

        let overlaps = set.overlapping(&set_of(&[body_ids[0], body_ids[5]]));
        assert_eq!(overlaps, vec![old, young]);

        assert!(set.overlapping(&set_of(&ids(2))).is_empty());
    }

    #[test]
    fn test_owner_of() {
        let mut set = ConstellationSet::new();
        let body_ids = ids(4);
        let id = set.found("Lyra".into(), body_ids[..3].to_vec(), Utc::now());

        assert_eq!(set.owner_of(body_ids[1]), Some(id));
        assert_eq!(set.owner_of(body_ids[3]), None);
    }

    #[test]
    fn test_verify_detects_violations() {
        let body_ids = ids(5);
        let now = Utc::now();

        let mut set = ConstellationSet::new();
        set.found("Lyra".into(), body_ids[..3].to_vec(), now);
        assert!(set.verify().is_ok());

        set.found("Draco".into(), body_ids[2..5].to_vec(), now);
        assert!(matches!(set.verify(), Err(InvariantViolation::SharedBody { .. })));

        let mut small = ConstellationSet::new();
        small.found("Tiny".into(), body_ids[..2].to_vec(), now);
        assert!(matches!(small.verify(), Err(InvariantViolation::TooFewMembers { count: 2, .. })));
    }

    #[test]
    fn test_serde_restores_sequence() {
        let mut set = ConstellationSet::new();
        let body_ids = ids(6);
        set.found("Lyra".into(), body_ids[..3].to_vec(), Utc::now());
        set.found("Draco".into(), body_ids[3..].to_vec(), Utc::now());

        let json = serde_json::to_string(&set).unwrap();
        let restored: ConstellationSet = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.next_sequence(), 2);
        assert_eq!(restored, set);
    }

    #[test]
    fn test_overlap_order_without_age_fields_is_stable() {
        let body_ids = ids(6);
        let mut constellation_ids = [Uuid::new_v4(), Uuid::new_v4()];
        let json = serde_json::json!([
            { "id": constellation_ids[0], "name": "Lyra", "members": &body_ids[..3] },
            { "id": constellation_ids[1], "name": "Draco", "members": &body_ids[3..] },
        ])
        .to_string();
        constellation_ids.sort();

        // Bridge cluster touching both
        let cluster = set_of(&[body_ids[0], body_ids[3]]);
        for _ in 0..50 {
            let set: ConstellationSet = serde_json::from_str(&json).unwrap();
            assert_eq!(set.overlapping(&cluster), constellation_ids.to_vec());
            let ordered: Vec<ConstellationId> = set.ordered().iter().map(|c| c.id).collect();
            assert_eq!(ordered, constellation_ids.to_vec());
        }
    }
}
