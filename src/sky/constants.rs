//! Sky constants - map geometry, clustering thresholds, rewards

/// Map geometry
pub mod map {
    /// Lower bound of the normalized coordinate space (both axes)
    pub const MIN: f32 = 0.0;
    /// Upper bound of the normalized coordinate space (both axes)
    pub const MAX: f32 = 1000.0;
}

/// Constellation detection constants
pub mod constellation {
    /// Two bodies are adjacent iff their distance is strictly less than this
    pub const PROXIMITY_THRESHOLD: f32 = 180.0;
    /// Minimum connected component size that counts as a constellation
    pub const MIN_MEMBERS: usize = 3;
}

/// Reward paid out when a new constellation is discovered
pub mod reward {
    /// Flat starlight bonus per constellation
    pub const STARLIGHT_BASE: u64 = 50;
    /// Starlight per member body
    pub const STARLIGHT_PER_MEMBER: u64 = 10;
    /// Flat data bonus per constellation
    pub const DATA_BASE: u64 = 20;
    /// Data per member body
    pub const DATA_PER_MEMBER: u64 = 5;
}

/// Placeholder body values used when the discovery oracle is unavailable
pub mod placeholder {
    /// Distance range in light years
    pub const DISTANCE_MIN_LY: f32 = 4.0;
    pub const DISTANCE_MAX_LY: f32 = 25_000.0;
    /// Neutral grey used for bodies without oracle styling
    pub const COLOR: &str = "#b0b0b0";
}

/// Persistence limits
pub mod save {
    /// Snapshot files larger than this are rejected on load
    pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
}
