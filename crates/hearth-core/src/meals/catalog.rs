use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::MealsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreparationMode {
    Fresh,
    Frozen,
}

impl PreparationMode {
    pub fn from_frozen(frozen: bool) -> Self {
        if frozen {
            Self::Frozen
        } else {
            Self::Fresh
        }
    }
}

impl fmt::Display for PreparationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => f.write_str("fresh"),
            Self::Frozen => f.write_str("frozen"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishStep {
    pub description: String,
    pub duration_minutes: u32,
}

impl DishStep {
    pub fn new(description: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            description: description.into(),
            duration_minutes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishCatalogEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<DishStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_frozen: Option<Vec<DishStep>>,
}

impl DishCatalogEntry {
    /// Step list for a mode; `None` when the dish cannot be prepared that way.
    pub fn steps_for(&self, mode: PreparationMode) -> Option<&[DishStep]> {
        match mode {
            PreparationMode::Fresh => self.steps.as_deref(),
            PreparationMode::Frozen => self.steps_frozen.as_deref(),
        }
    }

    pub fn supports(&self, mode: PreparationMode) -> bool {
        self.steps_for(mode).is_some()
    }
}

/// Immutable dish reference data with case-insensitive lookup.
///
/// Entries keep their load order; the index maps lower-cased names to
/// positions.
#[derive(Clone, Debug, Default)]
pub struct DishCatalog {
    entries: Vec<DishCatalogEntry>,
    index: HashMap<String, usize>,
}

impl DishCatalog {
    pub fn new(entries: impl IntoIterator<Item = DishCatalogEntry>) -> Result<Self, MealsError> {
        let mut catalog = Self::default();
        for entry in entries {
            let key = normalize(&entry.name);
            if key.is_empty() {
                return Err(MealsError::InvalidCatalog("dish with empty name".into()));
            }
            if catalog.index.contains_key(&key) {
                return Err(MealsError::InvalidCatalog(format!(
                    "duplicate dish: {}",
                    entry.name
                )));
            }
            catalog.index.insert(key, catalog.entries.len());
            catalog.entries.push(entry);
        }
        Ok(catalog)
    }

    /// The default household menu.
    pub fn builtin() -> Self {
        let entries = vec![
            DishCatalogEntry {
                name: "Pasta".into(),
                steps: Some(vec![
                    DishStep::new("Boil water", 10),
                    DishStep::new("Cook pasta", 10),
                ]),
                steps_frozen: None,
            },
            DishCatalogEntry {
                name: "Biryani".into(),
                steps: Some(vec![
                    DishStep::new("Put in oven", 15),
                    DishStep::new("Stir", 15),
                ]),
                steps_frozen: Some(vec![
                    DishStep::new("Put in oven", 20),
                    DishStep::new("Stir", 20),
                ]),
            },
            DishCatalogEntry {
                name: "Lasagne".into(),
                steps: Some(vec![DishStep::new("Cook", 35)]),
                steps_frozen: Some(vec![DishStep::new("Cook", 45)]),
            },
            DishCatalogEntry {
                name: "Soup".into(),
                steps: Some(vec![DishStep::new("Heat soup", 10)]),
                steps_frozen: None,
            },
            DishCatalogEntry {
                name: "Salad".into(),
                steps: Some(vec![DishStep::new("Prep", 10)]),
                steps_frozen: None,
            },
        ];
        let mut catalog = Self::default();
        for entry in entries {
            catalog.index.insert(normalize(&entry.name), catalog.entries.len());
            catalog.entries.push(entry);
        }
        catalog
    }

    /// Parse a JSON array of catalog entries.
    pub fn from_json(raw: &str) -> Result<Self, MealsError> {
        let entries: Vec<DishCatalogEntry> =
            serde_json::from_str(raw).map_err(|e| MealsError::InvalidCatalog(e.to_string()))?;
        Self::new(entries)
    }

    pub fn from_path(path: &Path) -> Result<Self, MealsError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MealsError::InvalidCatalog(format!("read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn get(&self, name: &str) -> Option<&DishCatalogEntry> {
        self.index.get(&normalize(name)).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[DishCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialized as an object keyed by the normalized dish name.
impl Serialize for DishCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&normalize(&entry.name), entry)?;
        }
        map.end()
    }
}

pub(crate) fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
