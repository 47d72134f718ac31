pub mod client;
pub mod handlers;
pub mod hub;
pub mod server;

pub use hub::{HubRegistry, SessionHub};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
