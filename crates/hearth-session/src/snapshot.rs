use chrono::NaiveDateTime;
use hearth_core::lights::LightsRegistry;
use hearth_core::meals::SelectedDishCollection;
use hearth_core::messages::ChatMessage;
use hearth_core::state::DomainState;
use serde::{Deserialize, Serialize};

/// Persisted form of one session.
///
/// `team` is the engine's own opaque state blob. Every field defaults, so
/// snapshots written before a field existed still load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub team: serde_json::Value,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub lights: LightsRegistry,
    #[serde(default)]
    pub meals: SelectedDishCollection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_time: Option<NaiveDateTime>,
}

impl SessionSnapshot {
    pub fn domain_state(&self) -> DomainState {
        DomainState {
            lights: self.lights.clone(),
            meals: self.meals.clone(),
            ready_time: self.ready_time,
        }
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
