pub mod lights;
pub mod meals;

use std::sync::Arc;

use hearth_core::meals::DishCatalog;

use crate::registry::{ToolRegistry, ToolSource};

pub const LIGHTS_PLUGIN: &str = "lights";
pub const MEALS_PLUGIN: &str = "meals";

/// Create a ToolRegistry with the lights and meals plugins.
pub fn create_default_registry(catalog: Arc<DishCatalog>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // Lights
    registry.register(Arc::new(lights::GetLightsTool), ToolSource::plugin(LIGHTS_PLUGIN));
    registry.register(Arc::new(lights::ChangeLightTool), ToolSource::plugin(LIGHTS_PLUGIN));

    // Meals
    let meals = ToolSource::plugin(MEALS_PLUGIN);
    registry.register(
        Arc::new(meals::DishOptionsTool::new(Arc::clone(&catalog))),
        meals.clone(),
    );
    registry.register(
        Arc::new(meals::AddDishTool::new(Arc::clone(&catalog))),
        meals.clone(),
    );
    registry.register(Arc::new(meals::RemoveDishTool), meals.clone());
    registry.register(Arc::new(meals::ListDishesTool), meals.clone());
    registry.register(
        Arc::new(meals::MealStepsTool::new(Arc::clone(&catalog))),
        meals.clone(),
    );
    registry.register(Arc::new(meals::SetReadyTimeTool), meals.clone());
    registry.register(Arc::new(meals::GetReadyTimeTool), meals);

    registry
}
