//! Sky model and clustering core
//!
//! Bodies are grouped into proximity clusters by [`graph::SpatialGraphBuilder`]
//! and reconciled into persistent constellations by
//! [`registry::ConstellationRegistry`].

pub mod body;
pub mod constants;
pub mod constellation;
pub mod graph;
pub mod registry;
pub mod save;
pub mod spatial;
pub mod state;

pub use body::{BodyCatalog, BodyId, BodyKind, BodyProfile, CelestialBody};
pub use constellation::{Constellation, ConstellationId, ConstellationSet, Reward};
pub use graph::{Cluster, SpatialGraphBuilder};
pub use registry::{ConstellationDiscovered, ConstellationRegistry, ReconcileChange, Reconciliation};
pub use save::SaveError;
pub use state::{Resources, SkyState};
