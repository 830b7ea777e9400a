//! Notifications pushed to observatory subscribers

use serde::Serialize;

use crate::oracle::Provenance;
use crate::sky::body::{BodyId, BodyKind};
use crate::sky::constellation::ConstellationId;
use crate::sky::registry::{ConstellationDiscovered, ReconcileChange};
use crate::sky::state::Resources;
use crate::util::vec2::Vec2;

/// Something that happened to the sky
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkyEvent {
    BodyDiscovered {
        id: BodyId,
        name: String,
        kind: BodyKind,
        position: Vec2,
        source: Provenance,
    },
    BodyAnalyzed {
        id: BodyId,
        source: Provenance,
    },
    ConstellationDiscovered(ConstellationDiscovered),
    ConstellationExtended {
        id: ConstellationId,
        added: usize,
    },
    ConstellationsMerged {
        target: ConstellationId,
        absorbed: Vec<ConstellationId>,
        added: usize,
    },
    ResourcesChanged(Resources),
    Reset,
}

impl SkyEvent {
    /// Event for a structural change that is not a founding
    pub(crate) fn from_growth(change: &ReconcileChange) -> Option<Self> {
        match change {
            ReconcileChange::Created { .. } => None,
            ReconcileChange::Extended { id, added } => Some(SkyEvent::ConstellationExtended {
                id: *id,
                added: *added,
            }),
            ReconcileChange::Merged {
                target,
                absorbed,
                added,
            } => Some(SkyEvent::ConstellationsMerged {
                target: *target,
                absorbed: absorbed.clone(),
                added: *added,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_growth_events_skip_creation() {
        let id = Uuid::new_v4();
        assert_eq!(SkyEvent::from_growth(&ReconcileChange::Created { id }), None);
        assert_eq!(
            SkyEvent::from_growth(&ReconcileChange::Extended { id, added: 2 }),
            Some(SkyEvent::ConstellationExtended { id, added: 2 })
        );
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let json = serde_json::to_value(SkyEvent::ResourcesChanged(Resources {
            starlight: 80,
            data: 35,
        }))
        .unwrap();

        assert_eq!(json["type"], "resources_changed");
        assert_eq!(json["starlight"], 80);
    }
}
