//! Game state container
//!
//! Everything the observatory owns between commands: bodies, constellations,
//! resources and the recent discovery log. The clustering core never holds
//! this itself; it is handed the pieces it needs and returns them updated.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sky::body::BodyCatalog;
use crate::sky::constellation::{ConstellationSet, Reward};

/// Default number of log entries kept
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Currency balances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub starlight: u64,
    #[serde(default)]
    pub data: u64,
}

impl Resources {
    pub fn credit(&mut self, reward: Reward) {
        self.starlight = self.starlight.saturating_add(reward.starlight);
        self.data = self.data.saturating_add(reward.data);
    }
}

/// What a log entry is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    BodyDiscovered,
    BodyAnalyzed,
    ConstellationDiscovered,
    ConstellationGrew,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub kind: LogKind,
    pub message: String,
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

/// Bounded log of recent events, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryLog {
    #[serde(default)]
    entries: VecDeque<LogEntry>,
    #[serde(default = "default_log_capacity")]
    capacity: usize,
}

impl Default for DiscoveryLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl DiscoveryLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1000)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, kind: LogKind, message: impl Into<String>) {
        self.entries.push_back(LogEntry {
            at: Utc::now(),
            kind,
            message: message.into(),
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Most recent entries first
    pub fn recent(&self, count: usize) -> Vec<&LogEntry> {
        self.entries.iter().rev().take(count).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Full game state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkyState {
    #[serde(default)]
    pub bodies: BodyCatalog,
    #[serde(default)]
    pub constellations: ConstellationSet,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub log: DiscoveryLog,
    /// Total scans performed (including placeholder discoveries)
    #[serde(default)]
    pub scans: u64,
}

impl SkyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_capacity(capacity: usize) -> Self {
        Self {
            log: DiscoveryLog::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Wipe everything except the log capacity setting
    pub fn reset(&mut self) {
        self.bodies.clear();
        self.constellations.clear();
        self.resources = Resources::default();
        self.log.clear();
        self.scans = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_reward() {
        let mut resources = Resources::default();
        resources.credit(Reward::for_cluster_size(3));
        resources.credit(Reward::for_cluster_size(4));
        assert_eq!(resources, Resources { starlight: 170, data: 75 });
    }

    #[test]
    fn test_log_is_bounded() {
        let mut log = DiscoveryLog::with_capacity(3);
        for i in 0..5 {
            log.push(LogKind::BodyDiscovered, format!("body {}", i));
        }

        assert_eq!(log.len(), 3);
        let recent = log.recent(2);
        assert_eq!(recent[0].message, "body 4");
        assert_eq!(recent[1].message, "body 3");
    }

    #[test]
    fn test_shrinking_capacity_drops_oldest() {
        let mut log = DiscoveryLog::with_capacity(5);
        for i in 0..5 {
            log.push(LogKind::BodyDiscovered, format!("body {}", i));
        }
        log.set_capacity(2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.recent(1)[0].message, "body 4");
    }

    #[test]
    fn test_reset_clears_state() {
        let mut state = SkyState::with_log_capacity(7);
        state.resources.credit(Reward::for_cluster_size(3));
        state.log.push(LogKind::BodyDiscovered, "x");
        state.scans = 4;

        state.reset();

        assert_eq!(state.resources, Resources::default());
        assert!(state.log.is_empty());
        assert_eq!(state.scans, 0);
    }
}
