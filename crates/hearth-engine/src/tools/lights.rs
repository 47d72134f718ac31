use std::time::Instant;

use async_trait::async_trait;
use hearth_core::tools::{Tool, ToolContext, ToolError, ToolResult};

/// Lists every light and whether it is on.
pub struct GetLightsTool;

#[async_trait]
impl Tool for GetLightsTool {
    fn name(&self) -> &str {
        "get_state"
    }

    fn description(&self) -> &str {
        "Gets a list of lights and their current state"
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
        ToolResult::json(&state.lights.all(), start.elapsed())
    }
}

/// Turns one light on or off.
pub struct ChangeLightTool;

#[async_trait]
impl Tool for ChangeLightTool {
    fn name(&self) -> &str {
        "change_state"
    }

    fn description(&self) -> &str {
        "Changes the state of the light"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["id", "is_on"],
            "properties": {
                "id": { "type": "integer", "description": "Light id" },
                "is_on": { "type": "boolean", "description": "Desired state" }
            }
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();

        let id = args["id"]
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| ToolError::InvalidArguments("id must be a non-negative integer".into()))?;
        let is_on = args["is_on"]
            .as_bool()
            .ok_or_else(|| ToolError::InvalidArguments("is_on must be a boolean".into()))?;

        let mut state = ctx.state.lock().await;
        match state.lights.set(id, is_on) {
            Some(light) => ToolResult::json(&light, start.elapsed()),
            None => Ok(ToolResult::rejected(
                format!("Light {id} not found."),
                start.elapsed(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::ids::SessionId;
    use hearth_core::state::DomainState;
    use tokio_util::sync::CancellationToken;

    fn test_ctx() -> ToolContext {
        ToolContext {
            session_id: SessionId::new(),
            agent: "lights_agent".into(),
            state: DomainState::default().into_shared(),
            abort_signal: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn get_state_lists_lights() {
        let result = GetLightsTool
            .execute(serde_json::json!({}), &test_ctx())
            .await
            .unwrap();
        let lights: serde_json::Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(lights.as_array().unwrap().len(), 3);
        assert_eq!(lights[0]["name"], "Table Lamp");
    }

    #[tokio::test]
    async fn change_state_mutates_session_state() {
        let ctx = test_ctx();
        let result = ChangeLightTool
            .execute(serde_json::json!({"id": 2, "is_on": true}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        let light: serde_json::Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(light["is_on"], true);
        assert!(ctx.state.lock().await.lights.get(2).unwrap().is_on);
    }

    #[tokio::test]
    async fn change_state_unknown_light() {
        let result = ChangeLightTool
            .execute(serde_json::json!({"id": 9, "is_on": true}), &test_ctx())
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(result.content, "Light 9 not found.");
    }

    #[tokio::test]
    async fn change_state_requires_arguments() {
        let err = ChangeLightTool
            .execute(serde_json::json!({"id": 1}), &test_ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = ChangeLightTool
            .execute(serde_json::json!({"id": -1, "is_on": false}), &test_ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
