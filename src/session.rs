//! Scan session lifecycle.
//!
//! A session owns one confirmation buffer and moves through
//! `Idle → Scanning → AwaitingConfirmation → Committing → Idle`. Transitions
//! are computed by [`transition`]; `ScanSession` applies them around the
//! actual scan and commit work.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::confirmation::{BufferError, BufferedDraft, CommitError, ConfirmationBuffer};
use crate::models::{DraftField, PantryItem};
use crate::pipeline::generative::ExtractionResult;
use crate::pipeline::scan::ScanOutcome;
use crate::store::PantryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Scanning,
    AwaitingConfirmation,
    Committing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    ScanStarted,
    ScanSucceeded,
    ScanFailed,
    CommitStarted,
    CommitSucceeded,
    CommitFailed,
    Cancelled,
}

/// How the last round ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionOutcome {
    ExtractionFailed { message: String },
    Committed { count: usize },
    Cancelled,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot apply {event:?} while {from:?}")]
    InvalidTransition {
        from: SessionState,
        event: SessionEvent,
    },

    #[error("Drafts can only be edited while awaiting confirmation (session is {0:?})")]
    NotEditable(SessionState),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// Next state for `event` in `from`, or `None` if the event is not allowed.
///
/// A new scan may start from `AwaitingConfirmation`; the caller discards the
/// buffer first. Nothing may start while `Scanning` or `Committing`.
pub fn transition(from: SessionState, event: SessionEvent) -> Option<SessionState> {
    use SessionEvent::*;
    use SessionState::*;

    match (from, event) {
        (Idle | AwaitingConfirmation, ScanStarted) => Some(Scanning),
        (Scanning, ScanSucceeded) => Some(AwaitingConfirmation),
        (Scanning, ScanFailed) => Some(Idle),
        (AwaitingConfirmation, CommitStarted) => Some(Committing),
        (Committing, CommitSucceeded) => Some(Idle),
        (Committing, CommitFailed) => Some(AwaitingConfirmation),
        (AwaitingConfirmation, Cancelled) => Some(Idle),
        _ => None,
    }
}

/// One owner's scan-and-confirm round.
#[derive(Debug, Clone)]
pub struct ScanSession {
    id: Uuid,
    owner_id: String,
    state: SessionState,
    buffer: ConfirmationBuffer,
    ocr_text: Option<String>,
    extraction: Option<ExtractionResult>,
    warnings: Vec<String>,
    last_outcome: Option<SessionOutcome>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl ScanSession {
    pub fn new(owner_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            state: SessionState::Idle,
            buffer: ConfirmationBuffer::new(),
            ocr_text: None,
            extraction: None,
            warnings: Vec::new(),
            last_outcome: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn buffer(&self) -> &ConfirmationBuffer {
        &self.buffer
    }

    pub fn last_outcome(&self) -> Option<&SessionOutcome> {
        self.last_outcome.as_ref()
    }

    /// Time of the last transition or draft edit.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// True when no scan or commit is in flight and nothing happened since
    /// `cutoff`.
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        !matches!(self.state, SessionState::Scanning | SessionState::Committing)
            && self.last_activity < cutoff
    }

    fn apply(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let next = transition(self.state, event).ok_or(SessionError::InvalidTransition {
            from: self.state,
            event,
        })?;
        tracing::debug!(session_id = %self.id, from = ?self.state, to = ?next, ?event, "Session transition");
        self.state = next;
        self.last_activity = Utc::now();
        Ok(())
    }

    /// Enter `Scanning`. Any drafts awaiting confirmation are discarded.
    pub fn begin_scan(&mut self) -> Result<(), SessionError> {
        self.apply(SessionEvent::ScanStarted)?;
        if !self.buffer.is_empty() {
            tracing::info!(
                session_id = %self.id,
                discarded = self.buffer.len(),
                "Re-scan discards pending drafts"
            );
        }
        self.buffer.clear();
        self.ocr_text = None;
        self.extraction = None;
        self.warnings.clear();
        Ok(())
    }

    /// Load a successful scan into the buffer.
    pub fn complete_scan(&mut self, outcome: ScanOutcome) -> Result<(), SessionError> {
        self.apply(SessionEvent::ScanSucceeded)?;
        self.buffer.load(outcome.drafts);
        self.ocr_text = Some(outcome.ocr_text);
        self.extraction = Some(outcome.extraction);
        self.warnings = outcome.warnings;
        self.last_outcome = None;
        Ok(())
    }

    pub fn fail_scan(&mut self, message: &str) -> Result<(), SessionError> {
        self.apply(SessionEvent::ScanFailed)?;
        self.last_outcome = Some(SessionOutcome::ExtractionFailed {
            message: message.to_string(),
        });
        Ok(())
    }

    fn require_awaiting(&self) -> Result<(), SessionError> {
        if self.state == SessionState::AwaitingConfirmation {
            Ok(())
        } else {
            Err(SessionError::NotEditable(self.state))
        }
    }

    /// Edit a draft. Only allowed while awaiting confirmation.
    pub fn update_draft(
        &mut self,
        draft_id: &Uuid,
        field: DraftField,
        value: serde_json::Value,
    ) -> Result<BufferedDraft, SessionError> {
        self.require_awaiting()?;
        let updated = self.buffer.update(draft_id, field, value)?.clone();
        self.last_activity = Utc::now();
        Ok(updated)
    }

    pub fn remove_draft(&mut self, draft_id: &Uuid) -> Result<BufferedDraft, SessionError> {
        self.require_awaiting()?;
        let removed = self.buffer.remove(draft_id)?;
        self.last_activity = Utc::now();
        Ok(removed)
    }

    /// Commit the buffer. On failure the session returns to
    /// `AwaitingConfirmation` with the buffer untouched.
    pub fn commit(&mut self, store: &dyn PantryStore) -> Result<Vec<PantryItem>, SessionError> {
        self.apply(SessionEvent::CommitStarted)?;
        match self.buffer.commit(store, &self.owner_id) {
            Ok(created) => {
                self.apply(SessionEvent::CommitSucceeded)?;
                self.ocr_text = None;
                self.extraction = None;
                self.warnings.clear();
                self.last_outcome = Some(SessionOutcome::Committed {
                    count: created.len(),
                });
                Ok(created)
            }
            Err(e) => {
                self.apply(SessionEvent::CommitFailed)?;
                Err(e.into())
            }
        }
    }

    /// Drop every pending draft and return to `Idle`.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.apply(SessionEvent::Cancelled)?;
        self.buffer.clear();
        self.ocr_text = None;
        self.extraction = None;
        self.warnings.clear();
        self.last_outcome = Some(SessionOutcome::Cancelled);
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            owner_id: self.owner_id.clone(),
            state: self.state,
            drafts: self.buffer.drafts().to_vec(),
            ocr_text: self.ocr_text.clone(),
            extracted_data: self.extraction.clone(),
            warnings: self.warnings.clone(),
            last_outcome: self.last_outcome.clone(),
            created_at: self.created_at,
        }
    }
}

/// Serializable view of a session for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub owner_id: String,
    pub state: SessionState,
    pub drafts: Vec<BufferedDraft>,
    pub ocr_text: Option<String>,
    pub extracted_data: Option<ExtractionResult>,
    pub warnings: Vec<String>,
    pub last_outcome: Option<SessionOutcome>,
    pub created_at: DateTime<Utc>,
}
