//! Portal web layer.
//!
//! The router is composable: `portal_router()` returns a `Router` that can
//! be mounted on any axum server instance. `start_portal_server()` binds
//! and serves it in the background.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::portal_router;
pub use server::{start_portal_server, PortalServer, PortalSession, ServerError};
pub use types::ApiContext;
