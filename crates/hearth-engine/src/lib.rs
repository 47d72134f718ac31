pub mod agents;
pub mod command;
pub mod registry;
pub mod scripted;
pub mod tools;

pub use agents::{AgentProfile, AgentRoster};
pub use command::{CommandEngine, CommandEngineFactory};
pub use registry::{ToolFilter, ToolRegistry, ToolSource};
pub use scripted::{ScriptStep, ScriptedEngine, ScriptedEngineFactory};
pub use tools::create_default_registry;
