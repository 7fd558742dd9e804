//! Shared types for the API layer.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Extractors with JSON error bodies
// ═══════════════════════════════════════════════════════════

/// `Json<T>` whose rejection renders as a 400 `VALIDATION` error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path<T>`; a malformed id is a 400, not a 404.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

// ═══════════════════════════════════════════════════════════
// Blocking work
// ═══════════════════════════════════════════════════════════

/// Run `work` on the blocking pool. Every database access, password hash and
/// advisory HTTP call goes through here; none of them run on the executor.
pub async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

/// Open a connection on the blocking pool and hand it to `work`.
pub async fn with_db<T, F>(core: &Arc<CoreState>, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Connection) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let core = core.clone();
    blocking(move || {
        let mut conn = core.open_db()?;
        work(&mut conn)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::advisory::MockCompletionClient;
    use crate::core_state::test_state;
    use crate::db::repository::get_user;

    #[tokio::test(flavor = "current_thread")]
    async fn with_db_queries_off_the_executor() {
        let (core, _dir) = test_state(Arc::new(MockCompletionClient::failing()));
        let user = with_db(&core, |conn| Ok(get_user(conn, &Uuid::new_v4())?))
            .await
            .unwrap();
        assert!(user.is_none());

        let err = with_db(&core, |_conn| -> Result<(), ApiError> {
            Err(ApiError::NotFound("Appointment not found".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn blocking_surfaces_worker_panics_as_internal() {
        let err = blocking(|| -> Result<(), ApiError> { panic!("worker died") })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
