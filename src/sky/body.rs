//! Celestial bodies and the catalog that owns them
//!
//! Bodies are created exactly once (on a successful scan) and are never
//! removed except by a full reset. The catalog keeps discovery order, which is
//! the input order handed to the constellation builder.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sky::constants::map;
use crate::util::vec2::Vec2;

/// Unique body identifier
pub type BodyId = Uuid;

/// Body category. Closed set: a new category is a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Star,
    Nebula,
    BlackHole,
    Galaxy,
    Anomaly,
}

impl BodyKind {
    pub const ALL: [BodyKind; 5] = [
        BodyKind::Star,
        BodyKind::Nebula,
        BodyKind::BlackHole,
        BodyKind::Galaxy,
        BodyKind::Anomaly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::Star => "star",
            BodyKind::Nebula => "nebula",
            BodyKind::BlackHole => "black_hole",
            BodyKind::Galaxy => "galaxy",
            BodyKind::Anomaly => "anomaly",
        }
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown body kind: {0}")]
pub struct UnknownBodyKind(pub String);

impl FromStr for BodyKind {
    type Err = UnknownBodyKind;

    /// Accepts the snake_case names plus the spaced/camel spellings oracles
    /// tend to produce ("Black Hole", "BlackHole").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "star" => Ok(BodyKind::Star),
            "nebula" => Ok(BodyKind::Nebula),
            "blackhole" => Ok(BodyKind::BlackHole),
            "galaxy" => Ok(BodyKind::Galaxy),
            "anomaly" => Ok(BodyKind::Anomaly),
            _ => Err(UnknownBodyKind(s.to_string())),
        }
    }
}

/// Optional spectral attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectral {
    /// Surface temperature in kelvin
    #[serde(default)]
    pub temperature_k: Option<u32>,
    /// Spectral class (e.g. "G2V")
    #[serde(default)]
    pub spectral_class: Option<String>,
}

/// Descriptive metadata produced by the discovery oracle (or the placeholder)
#[derive(Debug, Clone, PartialEq)]
pub struct BodyProfile {
    pub name: String,
    pub kind: BodyKind,
    pub description: String,
    pub distance_ly: f32,
    pub color: String,
    pub spectral: Option<Spectral>,
}

/// A discovered celestial body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialBody {
    /// Unique body identifier
    pub id: BodyId,
    /// Position in map space, both axes in [0, 1000]
    pub position: Vec2,
    /// When the body was discovered
    #[serde(default)]
    pub discovered_at: DateTime<Utc>,
    /// Display name
    pub name: String,
    /// Body category
    pub kind: BodyKind,
    /// Description text (analysis is appended here)
    #[serde(default)]
    pub description: String,
    /// Distance from the observer in light years
    #[serde(default)]
    pub distance_ly: f32,
    /// Hex display color
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub spectral: Option<Spectral>,
    /// Whether the analysis oracle has already run for this body
    #[serde(default)]
    pub analyzed: bool,
}

impl CelestialBody {
    /// Create a freshly discovered body at `position` (clamped to the map)
    pub fn discover(position: Vec2, profile: BodyProfile, discovered_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: position.clamp_components(map::MIN, map::MAX),
            discovered_at,
            name: profile.name,
            kind: profile.kind,
            description: profile.description,
            distance_ly: profile.distance_ly,
            color: profile.color,
            spectral: profile.spectral,
            analyzed: false,
        }
    }

    /// Append analysis text and mark the body analyzed.
    ///
    /// Returns false (and leaves the body untouched) if it was already analyzed.
    pub fn apply_analysis(&mut self, analysis: &str) -> bool {
        if self.analyzed {
            return false;
        }
        let analysis = analysis.trim();
        if !analysis.is_empty() {
            if !self.description.is_empty() {
                self.description.push_str("\n\n");
            }
            self.description.push_str(analysis);
        }
        self.analyzed = true;
        true
    }
}

/// Arena of discovered bodies keyed by id, iterated in discovery order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CelestialBody>", into = "Vec<CelestialBody>")]
pub struct BodyCatalog {
    bodies: Vec<CelestialBody>,
    index: FxHashMap<BodyId, usize>,
}

impl BodyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a body. Returns false if a body with the same id already exists.
    pub fn insert(&mut self, body: CelestialBody) -> bool {
        if self.index.contains_key(&body.id) {
            return false;
        }
        self.index.insert(body.id, self.bodies.len());
        self.bodies.push(body);
        true
    }

    pub fn get(&self, id: BodyId) -> Option<&CelestialBody> {
        self.index.get(&id).map(|&i| &self.bodies[i])
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut CelestialBody> {
        match self.index.get(&id) {
            Some(&i) => self.bodies.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.index.contains_key(&id)
    }

    /// Bodies in discovery order
    pub fn as_slice(&self) -> &[CelestialBody] {
        &self.bodies
    }

    pub fn iter(&self) -> impl Iterator<Item = &CelestialBody> {
        self.bodies.iter()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.index.clear();
    }
}

impl From<Vec<CelestialBody>> for BodyCatalog {
    fn from(bodies: Vec<CelestialBody>) -> Self {
        let mut catalog = Self::new();
        for mut body in bodies {
            // Saved positions are untrusted; keep them on the map like `discover` does
            body.position = body.position.clamp_components(map::MIN, map::MAX);
            // Duplicate ids in a hand-edited save keep the first occurrence
            catalog.insert(body);
        }
        catalog
    }
}

impl From<BodyCatalog> for Vec<CelestialBody> {
    fn from(catalog: BodyCatalog) -> Self {
        catalog.bodies
    }
}
