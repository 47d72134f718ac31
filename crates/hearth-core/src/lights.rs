use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightEntry {
    pub id: u32,
    pub name: String,
    pub is_on: bool,
}

/// Small fixed set of lights, mutated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LightsRegistry {
    lights: Vec<LightEntry>,
}

impl Default for LightsRegistry {
    fn default() -> Self {
        Self::new(vec![
            LightEntry { id: 1, name: "Table Lamp".into(), is_on: false },
            LightEntry { id: 2, name: "Porch light".into(), is_on: false },
            LightEntry { id: 3, name: "Chandelier".into(), is_on: true },
        ])
    }
}

impl LightsRegistry {
    pub fn new(lights: Vec<LightEntry>) -> Self {
        Self { lights }
    }

    pub fn all(&self) -> &[LightEntry] {
        &self.lights
    }

    pub fn get(&self, id: u32) -> Option<&LightEntry> {
        self.lights.iter().find(|l| l.id == id)
    }

    /// Switch a light. Returns the updated entry, or `None` for an unknown id.
    pub fn set(&mut self, id: u32, is_on: bool) -> Option<LightEntry> {
        let light = self.lights.iter_mut().find(|l| l.id == id)?;
        if light.is_on == is_on {
            debug!(light = %light.name, is_on, "light already in requested state");
        } else {
            debug!(light = %light.name, is_on, "changing light state");
            light.is_on = is_on;
        }
        Some(light.clone())
    }
}
