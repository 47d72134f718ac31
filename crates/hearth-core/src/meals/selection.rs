use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::{normalize, DishCatalog, PreparationMode};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedDish {
    pub name: String,
    pub frozen: bool,
}

impl SelectedDish {
    pub fn mode(&self) -> PreparationMode {
        PreparationMode::from_frozen(self.frozen)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added(SelectedDish),
    NotFound,
    UnsupportedMode(PreparationMode),
}

impl AddOutcome {
    /// Text reported back to the end user.
    pub fn describe(&self, requested: &str) -> String {
        match self {
            Self::Added(dish) => format!("Dish {} added.", dish.name),
            Self::NotFound => format!("Dish {requested} not found."),
            Self::UnsupportedMode(mode) => format!("Dish {requested} cannot be cooked from {mode}."),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(SelectedDish),
    NotFound,
}

impl RemoveOutcome {
    pub fn describe(&self, requested: &str) -> String {
        match self {
            Self::Removed(dish) => format!("Dish {} removed.", dish.name),
            Self::NotFound => format!("Dish {requested} not found."),
        }
    }
}

/// Dishes chosen for one meal, in selection order. Duplicates are allowed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedDishCollection {
    dishes: Vec<SelectedDish>,
}

impl SelectedDishCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, catalog: &DishCatalog, name: &str, frozen: bool) -> AddOutcome {
        let mode = PreparationMode::from_frozen(frozen);
        let Some(entry) = catalog.get(name) else {
            debug!(dish = name, "add_dish: not in catalog");
            return AddOutcome::NotFound;
        };
        if !entry.supports(mode) {
            debug!(dish = name, %mode, "add_dish: mode not supported");
            return AddOutcome::UnsupportedMode(mode);
        }
        let dish = SelectedDish {
            name: entry.name.clone(),
            frozen,
        };
        self.dishes.push(dish.clone());
        debug!(dish = %dish.name, frozen, "add_dish: added");
        AddOutcome::Added(dish)
    }

    /// Removes the first dish whose name matches case-insensitively.
    pub fn remove(&mut self, name: &str) -> RemoveOutcome {
        let key = normalize(name);
        match self.dishes.iter().position(|d| normalize(&d.name) == key) {
            Some(i) => {
                let dish = self.dishes.remove(i);
                debug!(dish = %dish.name, "remove_dish: removed");
                RemoveOutcome::Removed(dish)
            }
            None => RemoveOutcome::NotFound,
        }
    }

    pub fn list(&self) -> &[SelectedDish] {
        &self.dishes
    }

    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pasta_frozen_rejected_fresh_accepted() {
        let catalog = DishCatalog::builtin();
        let mut dishes = SelectedDishCollection::new();

        let outcome = dishes.add(&catalog, "Pasta", true);
        assert_eq!(outcome, AddOutcome::UnsupportedMode(PreparationMode::Frozen));
        assert_eq!(outcome.describe("Pasta"), "Dish Pasta cannot be cooked from frozen.");
        assert!(dishes.is_empty());

        let outcome = dishes.add(&catalog, "Pasta", false);
        assert!(matches!(outcome, AddOutcome::Added(_)));
        assert_eq!(dishes.len(), 1);
    }

    #[test]
    fn unknown_dish_is_not_found() {
        let catalog = DishCatalog::builtin();
        let mut dishes = SelectedDishCollection::new();
        let outcome = dishes.add(&catalog, "Pizza", false);
        assert_eq!(outcome, AddOutcome::NotFound);
        assert_eq!(outcome.describe("Pizza"), "Dish Pizza not found.");
    }

    #[test]
    fn added_dish_uses_catalog_display_name() {
        let catalog = DishCatalog::builtin();
        let mut dishes = SelectedDishCollection::new();
        dishes.add(&catalog, "bIrYaNi", true);
        assert_eq!(
            dishes.list(),
            &[SelectedDish { name: "Biryani".into(), frozen: true }]
        );
    }

    #[test]
    fn remove_is_case_insensitive_then_not_found() {
        let catalog = DishCatalog::builtin();
        let mut dishes = SelectedDishCollection::new();
        dishes.add(&catalog, "Pasta", false);

        let outcome = dishes.remove("pasta");
        assert!(matches!(outcome, RemoveOutcome::Removed(_)));
        assert_eq!(outcome.describe("pasta"), "Dish Pasta removed.");
        assert!(dishes.list().iter().all(|d| d.name != "Pasta"));

        assert_eq!(dishes.remove("pasta"), RemoveOutcome::NotFound);
    }

    #[test]
    fn remove_only_first_duplicate() {
        let catalog = DishCatalog::builtin();
        let mut dishes = SelectedDishCollection::new();
        dishes.add(&catalog, "Lasagne", false);
        dishes.add(&catalog, "Soup", false);
        dishes.add(&catalog, "Lasagne", true);

        dishes.remove("LASAGNE");
        assert_eq!(
            dishes.list(),
            &[
                SelectedDish { name: "Soup".into(), frozen: false },
                SelectedDish { name: "Lasagne".into(), frozen: true },
            ]
        );
    }

    #[test]
    fn serializes_as_list() {
        let catalog = DishCatalog::builtin();
        let mut dishes = SelectedDishCollection::new();
        dishes.add(&catalog, "Soup", false);
        let json = serde_json::to_value(&dishes).unwrap();
        assert_eq!(json, serde_json::json!([{"name": "Soup", "frozen": false}]));
    }
}
