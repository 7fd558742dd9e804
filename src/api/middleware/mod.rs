//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Audit logger — logs every request, including rejected ones
//! 2. Auth validator — required or optional, per route group

pub mod audit;
pub mod auth;
