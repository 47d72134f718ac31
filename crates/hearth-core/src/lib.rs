pub mod engine;
pub mod errors;
pub mod events;
pub mod ids;
pub mod lights;
pub mod meals;
pub mod messages;
pub mod state;
pub mod tools;

pub use errors::EngineError;
pub use ids::{SessionId, ToolCallId};
pub use state::{DomainState, SharedDomainState};
