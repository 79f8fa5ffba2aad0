//! Persistent pantry store.
//!
//! `PantryStore` is the commit boundary: everything the buffer and the API
//! persist goes through it. `SqlitePantryStore` is the shipped backend.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, repository, DatabaseError};
use crate::models::{Owner, PantryItem, ValidatedPantryItem};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    #[error("Pantry item not found: {0}")]
    NotFound(Uuid),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Owner-scoped pantry persistence.
pub trait PantryStore: Send + Sync {
    /// Register an owner, or refresh its display name.
    fn register_owner(&self, owner_id: &str, display_name: Option<&str>)
        -> Result<Owner, StoreError>;

    fn get_owner(&self, owner_id: &str) -> Result<Owner, StoreError>;

    /// Custom categories of an existing owner.
    fn custom_categories(&self, owner_id: &str) -> Result<Vec<String>, StoreError>;

    /// Returns false if the category was already registered.
    fn add_custom_category(&self, owner_id: &str, name: &str) -> Result<bool, StoreError>;

    /// Persist a batch atomically: either every item is stored or none is.
    fn create_items(
        &self,
        owner_id: &str,
        items: &[ValidatedPantryItem],
    ) -> Result<Vec<PantryItem>, StoreError>;

    fn get_item(&self, id: &Uuid) -> Result<PantryItem, StoreError>;

    fn update_item(&self, id: &Uuid, item: ValidatedPantryItem) -> Result<PantryItem, StoreError>;

    fn delete_item(&self, id: &Uuid) -> Result<(), StoreError>;

    fn list_items(&self, owner_id: &str) -> Result<Vec<PantryItem>, StoreError>;
}

/// SQLite-backed store. One connection, serialized behind a mutex.
pub struct SqlitePantryStore {
    conn: Mutex<Connection>,
}

impl SqlitePantryStore {
    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open_database(path)?;
        tracing::info!(path = %path.display(), "Pantry store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(db::open_memory_database()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn require_owner(conn: &Connection, owner_id: &str) -> Result<Owner, StoreError> {
    repository::get_owner(conn, owner_id)?
        .ok_or_else(|| StoreError::OwnerNotFound(owner_id.to_string()))
}

impl PantryStore for SqlitePantryStore {
    fn register_owner(
        &self,
        owner_id: &str,
        display_name: Option<&str>,
    ) -> Result<Owner, StoreError> {
        let conn = self.lock()?;
        repository::upsert_owner(
            &conn,
            &Owner {
                id: owner_id.to_string(),
                display_name: display_name.map(str::to_string),
                created_at: Utc::now(),
            },
        )?;
        require_owner(&conn, owner_id)
    }

    fn get_owner(&self, owner_id: &str) -> Result<Owner, StoreError> {
        let conn = self.lock()?;
        require_owner(&conn, owner_id)
    }

    fn custom_categories(&self, owner_id: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        require_owner(&conn, owner_id)?;
        Ok(repository::list_custom_categories(&conn, owner_id)?)
    }

    fn add_custom_category(&self, owner_id: &str, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        require_owner(&conn, owner_id)?;
        Ok(repository::insert_custom_category(&conn, owner_id, name)?)
    }

    fn create_items(
        &self,
        owner_id: &str,
        items: &[ValidatedPantryItem],
    ) -> Result<Vec<PantryItem>, StoreError> {
        let mut conn = self.lock()?;
        require_owner(&conn, owner_id)?;

        let records: Vec<PantryItem> = items
            .iter()
            .cloned()
            .map(|item| PantryItem::from_validated(owner_id, item))
            .collect();

        let tx = conn.transaction().map_err(DatabaseError::from)?;
        for record in &records {
            repository::insert_pantry_item(&tx, record)?;
        }
        tx.commit().map_err(DatabaseError::from)?;

        tracing::info!(owner_id, count = records.len(), "Pantry items created");
        Ok(records)
    }

    fn get_item(&self, id: &Uuid) -> Result<PantryItem, StoreError> {
        let conn = self.lock()?;
        repository::get_pantry_item(&conn, id)?.ok_or(StoreError::NotFound(*id))
    }

    fn update_item(&self, id: &Uuid, item: ValidatedPantryItem) -> Result<PantryItem, StoreError> {
        let conn = self.lock()?;
        let mut record = repository::get_pantry_item(&conn, id)?.ok_or(StoreError::NotFound(*id))?;
        record.apply(item);
        if !repository::update_pantry_item(&conn, &record)? {
            return Err(StoreError::NotFound(*id));
        }
        Ok(record)
    }

    fn delete_item(&self, id: &Uuid) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if repository::delete_pantry_item(&conn, id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(*id))
        }
    }

    fn list_items(&self, owner_id: &str) -> Result<Vec<PantryItem>, StoreError> {
        let conn = self.lock()?;
        require_owner(&conn, owner_id)?;
        Ok(repository::list_pantry_items_by_owner(&conn, owner_id)?)
    }
}
