//! REST API.
//!
//! Exposes the booking, directory, account and advisory modules as JSON
//! endpoints under `/api/`. Authentication is a per-route-group middleware:
//! open, optional (guest booking, symptom triage) or required.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::{set_expose_internal_details, ApiError};
pub use router::api_router;
pub use server::{start_api_server, ApiServer, ServerError, ServerSession};
pub use types::ApiContext;
