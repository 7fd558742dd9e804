//! Application state shared by every request handler.
//!
//! `CoreState` holds the loaded configuration and the advisory client.
//! SQLite connections are opened per request from the configured path, so
//! nothing here needs a lock.

use std::time::Instant;

use crate::advisory::{Advisor, AdvisoryError};
use crate::config::AppConfig;
use crate::db;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    config: AppConfig,
    advisor: Advisor,
    started_at: Instant,
}

impl CoreState {
    pub fn new(config: AppConfig, advisor: Advisor) -> Self {
        Self {
            config,
            advisor,
            started_at: Instant::now(),
        }
    }

    /// Migrate the database and build the advisory client.
    ///
    /// Call before entering the async runtime: the blocking HTTP client
    /// cannot be constructed from inside it.
    pub fn initialize(config: AppConfig) -> Result<Self, CoreError> {
        db::open_database(&config.database_path)?;
        let advisor = Advisor::from_config(&config.advisory)?;
        tracing::info!(path = %config.database_path.display(), "Database ready");
        Ok(Self::new(config, advisor))
    }

    /// Open a connection for the current request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::connect(&self.config.database_path).map_err(CoreError::Database)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn token_secret(&self) -> &[u8] {
        &self.config.token_secret
    }

    pub fn password_iterations(&self) -> u32 {
        self.config.password_iterations
    }

    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Test state over a migrated temp-file database. The `TempDir` guard must
/// outlive the state.
#[cfg(test)]
pub(crate) fn test_state(
    client: std::sync::Arc<dyn crate::advisory::CompletionClient>,
) -> (std::sync::Arc<CoreState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::for_tests(dir.path().join("oftalmo.db"));
    db::open_database(&config.database_path).unwrap();
    let advisor = Advisor::new(client, "symptom-model", "chat-model");
    (std::sync::Arc::new(CoreState::new(config, advisor)), dir)
}

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Advisory client error: {0}")]
    Advisory(#[from] AdvisoryError),
}
