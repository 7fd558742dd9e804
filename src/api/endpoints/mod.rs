//! API endpoint handlers.
//!
//! One module per resource. Handlers validate and delegate to the workflow
//! modules; they hold no business rules of their own.

pub mod appointments;
pub mod auth;
pub mod chat;
pub mod doctors;
pub mod health;
pub mod symptoms;
