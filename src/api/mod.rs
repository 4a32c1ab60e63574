//! HTTP API: router, handlers, and shared state

pub mod server;
pub mod state;

pub use server::{build_router, serve, ApiServerConfig};
pub use state::AppState;
