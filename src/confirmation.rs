//! Confirm-before-commit buffer.
//!
//! Drafts are edited here by a human, field by field, and only leave as
//! validated pantry items when every draft in the batch is complete.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::draft::{null_as_empty, optional_text, quantity_text};
use crate::models::{DraftField, LineItemDraft, PantryItem};
use crate::pipeline::validation::{validate_batch, ItemFailure, Vocabulary};
use crate::store::{PantryStore, StoreError};

/// A draft held by the buffer, with its local id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferedDraft {
    pub id: Uuid,
    #[serde(flatten)]
    pub draft: LineItemDraft,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BufferError {
    #[error("Draft not found: {0}")]
    DraftNotFound(Uuid),

    #[error("Unknown draft field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: DraftField, reason: String },
}

/// A draft that has no expiry date yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteDraft {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<Uuid>,
    pub name: String,
}

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Nothing to commit")]
    EmptyBatch,

    #[error("{} item(s) have no expiry date: {}", .incomplete.len(), names(.incomplete))]
    IncompleteBatch { incomplete: Vec<IncompleteDraft> },

    #[error("{} item(s) failed validation", .failures.len())]
    Validation { failures: Vec<ItemFailure> },

    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    #[error("Pantry store error: {0}")]
    Persistence(String),
}

fn names(incomplete: &[IncompleteDraft]) -> String {
    incomplete
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<StoreError> for CommitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OwnerNotFound(id) => CommitError::OwnerNotFound(id),
            other => CommitError::Persistence(other.to_string()),
        }
    }
}

/// Ordered, id-addressed drafts for one confirmation round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfirmationBuffer {
    drafts: Vec<BufferedDraft>,
}

impl ConfirmationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with freshly extracted drafts.
    pub fn load(&mut self, drafts: Vec<LineItemDraft>) {
        self.drafts = drafts
            .into_iter()
            .map(|draft| BufferedDraft {
                id: Uuid::new_v4(),
                draft,
            })
            .collect();
    }

    pub fn drafts(&self) -> &[BufferedDraft] {
        &self.drafts
    }

    pub fn get(&self, id: &Uuid) -> Option<&BufferedDraft> {
        self.drafts.iter().find(|d| d.id == *id)
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn clear(&mut self) {
        self.drafts.clear();
    }

    /// Set one field of one draft from a JSON value.
    pub fn update(
        &mut self,
        id: &Uuid,
        field: DraftField,
        value: serde_json::Value,
    ) -> Result<&BufferedDraft, BufferError> {
        let entry = self
            .drafts
            .iter_mut()
            .find(|d| d.id == *id)
            .ok_or(BufferError::DraftNotFound(*id))?;
        apply_field(&mut entry.draft, field, value)?;
        Ok(entry)
    }

    pub fn remove(&mut self, id: &Uuid) -> Result<BufferedDraft, BufferError> {
        let index = self
            .drafts
            .iter()
            .position(|d| d.id == *id)
            .ok_or(BufferError::DraftNotFound(*id))?;
        Ok(self.drafts.remove(index))
    }

    /// Validate and persist every draft, then empty the buffer.
    /// On any failure the buffer is left exactly as it was.
    pub fn commit(
        &mut self,
        store: &dyn PantryStore,
        owner_id: &str,
    ) -> Result<Vec<PantryItem>, CommitError> {
        let created = commit_drafts(
            store,
            owner_id,
            self.drafts.iter().map(|d| (Some(d.id), &d.draft)),
        )?;
        self.clear();
        Ok(created)
    }
}

/// All-or-nothing commit of a batch of drafts.
///
/// Order of checks: empty batch, missing expiry dates, owner lookup, domain
/// validation, then a single store write.
pub fn commit_drafts<'a, I>(
    store: &dyn PantryStore,
    owner_id: &str,
    drafts: I,
) -> Result<Vec<PantryItem>, CommitError>
where
    I: IntoIterator<Item = (Option<Uuid>, &'a LineItemDraft)>,
{
    let start = std::time::Instant::now();
    let drafts: Vec<(Option<Uuid>, &LineItemDraft)> = drafts.into_iter().collect();
    if drafts.is_empty() {
        return Err(CommitError::EmptyBatch);
    }

    let incomplete: Vec<IncompleteDraft> = drafts
        .iter()
        .enumerate()
        .filter(|(_, (_, draft))| !draft.has_expiry_date())
        .map(|(index, (draft_id, draft))| IncompleteDraft {
            index,
            draft_id: *draft_id,
            name: draft.name.clone(),
        })
        .collect();
    if !incomplete.is_empty() {
        tracing::info!(
            owner_id,
            incomplete = incomplete.len(),
            total = drafts.len(),
            "Commit refused: missing expiry dates"
        );
        return Err(CommitError::IncompleteBatch { incomplete });
    }

    let vocabulary = Vocabulary::with_custom(store.custom_categories(owner_id)?);
    let items = validate_batch(drafts.iter().copied(), &vocabulary)
        .map_err(|failures| CommitError::Validation { failures })?;

    let created = store.create_items(owner_id, &items)?;
    tracing::info!(
        owner_id,
        count = created.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Drafts committed"
    );
    Ok(created)
}

fn apply_field(
    draft: &mut LineItemDraft,
    field: DraftField,
    value: serde_json::Value,
) -> Result<(), BufferError> {
    let invalid = |e: serde_json::Error| BufferError::InvalidValue {
        field,
        reason: e.to_string(),
    };

    match field {
        DraftField::Name => {
            draft.name = match value {
                serde_json::Value::String(s) => s,
                other => {
                    return Err(BufferError::InvalidValue {
                        field,
                        reason: format!("expected a string, got {other}"),
                    })
                }
            }
        }
        DraftField::Quantity => draft.quantity = quantity_text(value).map_err(invalid)?,
        DraftField::Categories => draft.categories = null_as_empty(value).map_err(invalid)?,
        DraftField::Amount => draft.amount = optional_text(value).map_err(invalid)?,
        DraftField::Unit => draft.unit = optional_string(field, value)?,
        DraftField::ExpiryDate => draft.expiry_date = optional_string(field, value)?,
        DraftField::Notes => draft.notes = optional_string(field, value)?,
        DraftField::ImageUrl => draft.image_url = optional_string(field, value)?,
    }
    Ok(())
}

/// `null` or blank clears; otherwise the value must be a string.
fn optional_string(
    field: DraftField,
    value: serde_json::Value,
) -> Result<Option<String>, BufferError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s.trim().to_string())),
        other => Err(BufferError::InvalidValue {
            field,
            reason: format!("expected a string or null, got {other}"),
        }),
    }
}
