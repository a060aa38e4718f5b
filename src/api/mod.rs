//! HTTP API.
//!
//! Routes are nested under `/api/` behind CORS and a per-client rate
//! limiter. `api_router()` returns a `Router` that can be mounted on any
//! axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{serve, start_server, ApiServer, ApiSession, ServerError};
pub use types::{ApiContext, RateLimiter};
