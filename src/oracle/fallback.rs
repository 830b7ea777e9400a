//! Deterministic stand-ins for oracle output

use rand::Rng;

use crate::sky::body::{BodyKind, BodyProfile, CelestialBody};
use crate::sky::constants::placeholder;

static NAME_PREFIXES: &[&str] = &[
    "Argent", "Azure", "Boreal", "Cinder", "Crimson", "Drifting", "Ember", "Fallen",
    "Gilded", "Hollow", "Ivory", "Jade", "Lonely", "Obsidian", "Pale", "Silent",
];

static NAME_ROOTS: &[&str] = &[
    "Anvil", "Archer", "Beacon", "Chalice", "Crown", "Harp", "Heron", "Lantern",
    "Loom", "Mantis", "Serpent", "Sextant", "Spindle", "Stag", "Veil", "Wyrm",
];

/// SplitMix64 finalizer
fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Prefix + root name for the constellation with creation `sequence`.
///
/// Same inputs always give the same name. Never empty.
pub fn constellation_name(sequence: u64, cluster_size: usize) -> String {
    let h = mix64(sequence ^ ((cluster_size as u64) << 40));
    let prefix = NAME_PREFIXES[(h % NAME_PREFIXES.len() as u64) as usize];
    let root = NAME_ROOTS[((h >> 32) % NAME_ROOTS.len() as u64) as usize];
    format!("The {} {}", prefix, root)
}

/// Generic body used when the discovery oracle is unavailable
pub fn placeholder_profile<R: Rng>(rng: &mut R, existing_count: usize) -> BodyProfile {
    let distance_ly = rng.gen_range(placeholder::DISTANCE_MIN_LY..placeholder::DISTANCE_MAX_LY);

    BodyProfile {
        name: format!("Uncharted Object {:04}", existing_count + 1),
        kind: BodyKind::Star,
        description: "A faint point of light awaiting closer study.".to_string(),
        distance_ly,
        color: placeholder::COLOR.to_string(),
        spectral: None,
    }
}

/// Canned analysis appended when the analysis oracle is unavailable
pub fn analysis_text(body: &CelestialBody) -> String {
    let detail = match body.kind {
        BodyKind::Star => "Its light curve is steady, with no sign of companions.",
        BodyKind::Nebula => "Emission lines suggest ionized hydrogen and trace oxygen.",
        BodyKind::BlackHole => "Lensing of background stars confirms a compact mass.",
        BodyKind::Galaxy => "Redshift places it well beyond the local group.",
        BodyKind::Anomaly => "Readings remain inconsistent between passes.",
    };
    format!(
        "Follow-up survey of {} at {:.0} ly. {}",
        body.name, body.distance_ly, detail
    )
}
