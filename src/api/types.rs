//! Shared types for the API layer.

use std::sync::{Arc, MutexGuard};

use crate::api::error::ApiError;
use crate::core_state::{CoreState, SharedSession};
use crate::session::ScanSession;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Registered session by id, or 404.
    pub fn session(&self, id: &uuid::Uuid) -> Result<SharedSession, ApiError> {
        self.core
            .session(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Session {id}")))
    }
}

/// Run store or scanner work off the async executor.
pub async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {e}")))?
}

/// Lock one session. Never hold the guard across an `.await`.
pub fn lock_session(session: &SharedSession) -> Result<MutexGuard<'_, ScanSession>, ApiError> {
    session
        .lock()
        .map_err(|_| ApiError::Internal("session lock poisoned".into()))
}
