//! Stargazer Observatory Library
//!
//! Core of an idle astronomy game: bodies are discovered on a 2D sky map,
//! grouped into proximity clusters, and reconciled into named, persistent
//! constellations that pay out resources when first charted.
//!
//! # Features
//!
//! - `oracle` - Claude-backed naming, discovery and analysis (enabled by default).
//!   Without it every oracle call takes the deterministic fallback path.

pub mod config;
pub mod metrics;
pub mod observatory;
pub mod oracle;
pub mod sky;
pub mod util;
