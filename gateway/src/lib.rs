//! Library surface for the gateway binary, split out so integration tests
//! can build an [`AppState`] and router without going through `main`.

pub mod config;
pub mod error;
pub mod routes;
pub mod sse_merge;
pub mod state;
pub mod upstream;
pub mod version;

pub use config::GatewayConfig;
pub use state::AppState;
