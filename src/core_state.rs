//! Shared application state.
//!
//! `CoreState` owns the store, the scanner and the registry of open scan
//! sessions. It is wrapped in `Arc` at startup and handed to the HTTP layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AppConfig, ConfigError};
use crate::pipeline::entities::{DocumentAiClient, TaggingError};
use crate::pipeline::generative::OllamaClient;
use crate::pipeline::scan::ReceiptScanner;
use crate::pipeline::validation::Vocabulary;
use crate::pipeline::ExtractionError;
use crate::session::ScanSession;
use crate::store::{PantryStore, SqlitePantryStore, StoreError};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Vision client error: {0}")]
    Vision(#[from] ExtractionError),

    #[error("Entity tagger error: {0}")]
    Tagger(#[from] TaggingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(#[from] crate::api::ServerError),

    #[error("Session registry lock poisoned")]
    LockPoisoned,
}

pub type SharedSession = Arc<Mutex<ScanSession>>;

pub struct CoreState {
    pub config: AppConfig,
    store: Arc<dyn PantryStore>,
    scanner: Arc<ReceiptScanner>,
    /// Open sessions. Never held across a scan or store call; each
    /// session carries its own mutex.
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl CoreState {
    pub fn new(config: AppConfig, store: Arc<dyn PantryStore>, scanner: ReceiptScanner) -> Self {
        Self {
            config,
            store,
            scanner: Arc::new(scanner),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Build the production collaborators described by `config`.
    ///
    /// Creates blocking HTTP clients, so call this outside any async runtime.
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        let store = SqlitePantryStore::open(&config.db_path)?;

        let vision = OllamaClient::new(&config.ollama_url, config.http_timeout)?;
        let mut scanner =
            ReceiptScanner::new(Arc::new(vision), &config.vision_model, &config.upload_dir);

        if let Some(endpoint) = &config.entity_endpoint {
            let tagger =
                DocumentAiClient::new(endpoint, config.entity_token.clone(), config.http_timeout)?;
            scanner = scanner.with_tagger(Arc::new(tagger));
            tracing::info!(%endpoint, "Entity tagging source enabled");
        }

        tracing::info!(
            ollama_url = %config.ollama_url,
            model = %config.vision_model,
            timeout_secs = config.http_timeout.map(|t| t.as_secs()),
            "Receipt scanner configured"
        );

        Ok(Self::new(config, Arc::new(store), scanner))
    }

    pub fn store(&self) -> Arc<dyn PantryStore> {
        Arc::clone(&self.store)
    }

    pub fn scanner(&self) -> Arc<ReceiptScanner> {
        Arc::clone(&self.scanner)
    }

    /// Fixed vocabulary merged with the owner's custom categories.
    pub fn vocabulary(&self, owner_id: &str) -> Result<Vocabulary, StoreError> {
        Ok(Vocabulary::with_custom(self.store.custom_categories(owner_id)?))
    }

    /// Open a session for an existing owner. Idle sessions past the
    /// configured TTL are evicted first.
    pub fn open_session(&self, owner_id: &str) -> Result<SharedSession, CoreError> {
        self.store.get_owner(owner_id)?;
        self.evict_idle_sessions(Utc::now())?;
        let session = ScanSession::new(owner_id);
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));

        self.sessions
            .write()
            .map_err(|_| CoreError::LockPoisoned)?
            .insert(id, Arc::clone(&shared));
        tracing::info!(session_id = %id, owner_id, "Scan session opened");
        Ok(shared)
    }

    pub fn session(&self, id: &Uuid) -> Result<Option<SharedSession>, CoreError> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| CoreError::LockPoisoned)?
            .get(id)
            .cloned())
    }

    pub fn close_session(&self, id: &Uuid) -> Result<Option<SharedSession>, CoreError> {
        let removed = self
            .sessions
            .write()
            .map_err(|_| CoreError::LockPoisoned)?
            .remove(id);
        if removed.is_some() {
            tracing::info!(session_id = %id, "Scan session closed");
        }
        Ok(removed)
    }

    /// Drop sessions with no activity for longer than `config.session_ttl`
    /// as of `now`. Sessions that are scanning, committing or locked by a
    /// request are kept.
    pub fn evict_idle_sessions(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let ttl = chrono::Duration::from_std(self.config.session_ttl)
            .unwrap_or(chrono::Duration::MAX);
        let cutoff = now.checked_sub_signed(ttl).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut sessions = self.sessions.write().map_err(|_| CoreError::LockPoisoned)?;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(guard) => !guard.is_idle_since(cutoff),
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Evicted idle scan sessions");
        }
        Ok(evicted)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::core_with_reply;
    use super::*;

    #[test]
    fn open_session_requires_owner() {
        let dir = tempfile::tempdir().unwrap();
        let core = core_with_reply(dir.path(), "");
        assert!(matches!(
            core.open_session("ghost"),
            Err(CoreError::Store(StoreError::OwnerNotFound(_)))
        ));
        assert_eq!(core.session_count(), 0);
    }

    #[test]
    fn session_registry_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let core = core_with_reply(dir.path(), "");
        let session = core.open_session("owner-1").unwrap();
        let id = session.lock().unwrap().id();

        assert!(core.session(&id).unwrap().is_some());
        assert_eq!(core.session_count(), 1);
        assert!(core.close_session(&id).unwrap().is_some());
        assert!(core.session(&id).unwrap().is_none());
        assert!(core.close_session(&id).unwrap().is_none());
    }

    #[test]
    fn idle_sessions_are_evicted_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let core = core_with_reply(dir.path(), "");
        let ttl = chrono::Duration::from_std(core.config.session_ttl).unwrap();

        let finished = core.open_session("owner-1").unwrap();
        {
            let mut session = finished.lock().unwrap();
            session.begin_scan().unwrap();
            session.fail_scan("blurry").unwrap();
        }
        let scanning = core.open_session("owner-1").unwrap();
        scanning.lock().unwrap().begin_scan().unwrap();
        let scanning_id = scanning.lock().unwrap().id();

        assert_eq!(core.evict_idle_sessions(Utc::now()).unwrap(), 0);
        assert_eq!(core.session_count(), 2);

        let later = Utc::now() + ttl + chrono::Duration::seconds(1);
        assert_eq!(core.evict_idle_sessions(later).unwrap(), 1);
        assert_eq!(core.session_count(), 1);
        assert!(core.session(&scanning_id).unwrap().is_some());
    }

    #[test]
    fn opening_a_session_sweeps_stale_ones() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = core_with_reply(dir.path(), "");
        core.config.session_ttl = std::time::Duration::from_millis(1);

        for _ in 0..50 {
            let session = core.open_session("owner-1").unwrap();
            let mut session = session.lock().unwrap();
            session.begin_scan().unwrap();
            session.fail_scan("blurry").unwrap();
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
        core.open_session("owner-1").unwrap();
        assert_eq!(core.session_count(), 1);
    }

    #[test]
    fn vocabulary_includes_custom_categories() {
        let dir = tempfile::tempdir().unwrap();
        let core = core_with_reply(dir.path(), "");
        core.store().add_custom_category("owner-1", "Spices").unwrap();
        let vocab = core.vocabulary("owner-1").unwrap();
        assert!(vocab.allows_category("Spices"));
        assert!(vocab.allows_category("Dairy"));
    }
}
