use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use hearth_core::meals::{
    compute_steps, parse_ready_time_today, AddOutcome, DishCatalog, MealsError, RemoveOutcome,
};
use hearth_core::tools::{Tool, ToolContext, ToolError, ToolResult};
use tracing::debug;

fn required_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    args[key]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("{key} is required")))
}

/// Lists the dish catalog, including cooking times.
pub struct DishOptionsTool {
    catalog: Arc<DishCatalog>,
}

impl DishOptionsTool {
    pub fn new(catalog: Arc<DishCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for DishOptionsTool {
    fn name(&self) -> &str {
        "get_dish_options"
    }

    fn description(&self) -> &str {
        "Gets a list of dishes to choose from, including their cooking time"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(
        &self,
        _args: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        ToolResult::json(self.catalog.as_ref(), start.elapsed())
    }
}

pub struct AddDishTool {
    catalog: Arc<DishCatalog>,
}

impl AddDishTool {
    pub fn new(catalog: Arc<DishCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for AddDishTool {
    fn name(&self) -> &str {
        "add_dish"
    }

    fn description(&self) -> &str {
        "Adds a dish to the list of dishes to cook"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "frozen": { "type": "boolean", "description": "Cook from frozen; defaults to fresh" }
            }
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let name = required_str(&args, "name")?;
        let frozen = match &args["frozen"] {
            serde_json::Value::Null => false,
            v => v
                .as_bool()
                .ok_or_else(|| ToolError::InvalidArguments("frozen must be a boolean".into()))?,
        };

        let mut state = ctx.state.lock().await;
        let outcome = state.meals.add(&self.catalog, name, frozen);
        let text = outcome.describe(name);
        Ok(match outcome {
            AddOutcome::Added(_) => ToolResult::text(text, start.elapsed()),
            _ => ToolResult::rejected(text, start.elapsed()),
        })
    }
}

pub struct RemoveDishTool;

#[async_trait]
impl Tool for RemoveDishTool {
    fn name(&self) -> &str {
        "remove_dish"
    }

    fn description(&self) -> &str {
        "Removes a dish from the list of dishes to cook"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let name = required_str(&args, "name")?;

        let mut state = ctx.state.lock().await;
        let outcome = state.meals.remove(name);
        let text = outcome.describe(name);
        Ok(match outcome {
            RemoveOutcome::Removed(_) => ToolResult::text(text, start.elapsed()),
            RemoveOutcome::NotFound => ToolResult::rejected(text, start.elapsed()),
        })
    }
}

pub struct ListDishesTool;

#[async_trait]
impl Tool for ListDishesTool {
    fn name(&self) -> &str {
        "get_dishes"
    }

    fn description(&self) -> &str {
        "Gets the list of dishes to cook"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(
        &self,
        _args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let state = ctx.state.lock().await;
        ToolResult::json(&state.meals.list(), start.elapsed())
    }
}

/// Produces the time-ordered preparation plan for the selected dishes.
///
/// Falls back to the stored ready time when no `ready_time` argument is given.
pub struct MealStepsTool {
    catalog: Arc<DishCatalog>,
}

impl MealStepsTool {
    pub fn new(catalog: Arc<DishCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for MealStepsTool {
    fn name(&self) -> &str {
        "get_meal_steps"
    }

    fn description(&self) -> &str {
        "Gets the instructions for the meal listing the steps for all the dishes to be ready for the desired time"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "ready_time": {
                    "type": "string",
                    "description": "When the meal should be ready, e.g. '18:00' or '2022-12-31T18:00'"
                }
            }
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let state = ctx.state.lock().await;

        let ready_time = match args["ready_time"].as_str() {
            Some(raw) => parse_ready_time_today(raw),
            None => state.ready_time.ok_or(MealsError::ReadyTimeNotSet),
        };
        let plan = ready_time
            .and_then(|ready| compute_steps(state.meals.list(), ready, &self.catalog));

        match plan {
            Ok(steps) => {
                debug!(steps = steps.len(), "get_meal_steps: computed plan");
                ToolResult::json(&steps, start.elapsed())
            }
            Err(e) => Ok(ToolResult::rejected(e.to_string(), start.elapsed())),
        }
    }
}

pub struct SetReadyTimeTool;

#[async_trait]
impl Tool for SetReadyTimeTool {
    fn name(&self) -> &str {
        "set_time_to_be_ready"
    }

    fn description(&self) -> &str {
        "Sets the time by which the meal should be ready"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["time"],
            "properties": { "time": { "type": "string" } }
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let raw = required_str(&args, "time")?;
        match parse_ready_time_today(raw) {
            Ok(ready) => {
                ctx.state.lock().await.ready_time = Some(ready);
                Ok(ToolResult::text(
                    format!("Time to be ready set to {}.", ready.format("%Y-%m-%d %H:%M:%S")),
                    start.elapsed(),
                ))
            }
            Err(e) => Ok(ToolResult::rejected(e.to_string(), start.elapsed())),
        }
    }
}

pub struct GetReadyTimeTool;

#[async_trait]
impl Tool for GetReadyTimeTool {
    fn name(&self) -> &str {
        "get_time_to_be_ready"
    }

    fn description(&self) -> &str {
        "Gets the time by which the meal should be ready"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(
        &self,
        _args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let state = ctx.state.lock().await;
        ToolResult::json(&state.ready_time, start.elapsed())
    }
}
