pub mod error;
pub mod manager;
pub mod router;
pub mod session;
pub mod snapshot;

pub use error::SessionError;
pub use manager::SessionManager;
pub use router::{RoutingState, SessionRouter};
pub use session::AgentSession;
pub use snapshot::SessionSnapshot;
