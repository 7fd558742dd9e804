//! Audit logging middleware.
//!
//! Logs every API request with method, path, response status, latency and
//! the authenticated caller when there is one. Runs outermost so rejected
//! requests are logged too.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::authorization::CallerContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match response.extensions().get::<CallerContext>() {
        Some(caller) => tracing::info!(
            %method,
            %path,
            status,
            elapsed_ms,
            caller = %caller.id,
            role = %caller.role,
            "API access"
        ),
        None => tracing::info!(
            %method,
            %path,
            status,
            elapsed_ms,
            caller = "anonymous",
            "API access"
        ),
    }

    response
}
