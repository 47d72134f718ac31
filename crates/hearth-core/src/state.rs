use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::lights::LightsRegistry;
use crate::meals::SelectedDishCollection;

/// Mutable plugin state owned by one session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainState {
    #[serde(default)]
    pub lights: LightsRegistry,
    #[serde(default)]
    pub meals: SelectedDishCollection,
    /// Ready time stored by `set_time_to_be_ready`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_time: Option<NaiveDateTime>,
}

/// Domain state shared between a session and the tools its engine invokes.
/// Held across `.await` points, hence the async mutex.
pub type SharedDomainState = Arc<Mutex<DomainState>>;

impl DomainState {
    pub fn into_shared(self) -> SharedDomainState {
        Arc::new(Mutex::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::DishCatalog;

    #[tokio::test]
    async fn shared_state_is_mutated_in_place() {
        let shared = DomainState::default().into_shared();
        {
            let mut state = shared.lock().await;
            state.lights.set(1, true);
            state.meals.add(&DishCatalog::builtin(), "soup", false);
        }
        let state = shared.lock().await;
        assert!(state.lights.get(1).unwrap().is_on);
        assert_eq!(state.meals.len(), 1);
    }

    #[test]
    fn missing_fields_default() {
        let state: DomainState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, DomainState::default());
    }
}
