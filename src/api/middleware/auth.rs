//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, verifies the signature and
//! expiry, loads the subject from the identity store, and injects
//! `CallerContext` into request extensions for downstream handlers.

use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{with_db, ApiContext};
use crate::authorization::CallerContext;
use crate::crypto;
use crate::db::repository::get_user;

/// Require a valid bearer token.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match authenticate_inner(req, next, true).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

/// Anonymous requests pass through without a `CallerContext`. A header that
/// is present but invalid is rejected exactly as in [`require_auth`].
pub async fn optional_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match authenticate_inner(req, next, false).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn authenticate_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
    required: bool,
) -> Result<Response, ApiError> {
    if !required && !req.headers().contains_key(header::AUTHORIZATION) {
        return Ok(next.run(req).await);
    }

    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    // 1. Extract bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    // 2. Signature + expiry
    let now = chrono::Utc::now().timestamp();
    let claims = crypto::verify_token(ctx.core.token_secret(), token, now)?;

    // 3. Subject must still exist
    let user = with_db(&ctx.core, move |conn| Ok(get_user(conn, &claims.sub)?))
        .await?
        .ok_or(ApiError::UnknownSubject)?;

    let caller = CallerContext {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    };

    // 4. Inject caller context for handlers
    req.extensions_mut().insert(caller.clone());

    let mut response = next.run(req).await;

    // Audit runs outside this layer and reads the caller from the response.
    response.extensions_mut().insert(caller);
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok(response)
}
